//! Historical backtest simulator.
//!
//! Steps a fixed-weight portfolio through historical closes day by day:
//! validate the configuration, open positions at target weights, revalue at
//! each trading day on the shared calendar, rebalance on the configured
//! cadence, and assemble the result with derived metrics.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::TradingCalendar;
use crate::error::{InsufficientDataError, Result, SimulationError, ValidationError};
use crate::provider::PriceProvider;
use crate::risk::{DEFAULT_RISK_FREE_RATE, RiskMetrics, beta, compute_risk_metrics};
use crate::series::{AllocationTarget, DateRange, PricePoint, is_usable};
use crate::stats::daily_returns;

/// How often holdings are pulled back to target weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceFrequency {
    /// Buy and hold
    #[default]
    None,
    Monthly,
    Quarterly,
    Annually,
}

impl RebalanceFrequency {
    /// Days that must elapse since the last rebalance before the next one.
    #[must_use]
    pub fn interval_days(self) -> Option<i32> {
        match self {
            RebalanceFrequency::None => None,
            RebalanceFrequency::Monthly => Some(30),
            RebalanceFrequency::Quarterly => Some(90),
            RebalanceFrequency::Annually => Some(365),
        }
    }
}

/// Backtest parameters. Constructed per request, validated once up front,
/// then immutable for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub allocation: AllocationTarget,
    pub start: Date,
    pub end: Date,
    pub initial_capital: f64,
    pub rebalancing: RebalanceFrequency,
    /// Annualized risk-free rate fed into Sharpe/Sortino.
    pub risk_free_rate: f64,
    /// Optional benchmark ticker for the comparison block of the result.
    pub benchmark: Option<String>,
}

impl BacktestConfig {
    #[must_use]
    pub fn new(allocation: AllocationTarget, start: Date, end: Date, initial_capital: f64) -> Self {
        Self {
            allocation,
            start,
            end,
            initial_capital,
            rebalancing: RebalanceFrequency::None,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            benchmark: None,
        }
    }

    #[must_use]
    pub fn with_rebalancing(mut self, rebalancing: RebalanceFrequency) -> Self {
        self.rebalancing = rebalancing;
        self
    }

    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    #[must_use]
    pub fn with_benchmark(mut self, ticker: impl Into<String>) -> Self {
        self.benchmark = Some(ticker.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.allocation.validate()?;
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ValidationError::NonPositiveCapital {
                capital: self.initial_capital,
            });
        }
        self.range().validate()
    }

    #[must_use]
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

/// One position inside a [`PortfolioSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ticker: String,
    pub shares: f64,
    pub value: f64,
}

/// Portfolio state on one trading day; one per calendar day in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: Date,
    pub total_value: f64,
    /// Positions in sorted ticker order.
    pub positions: Vec<PositionSnapshot>,
}

/// Portfolio return for one calendar year of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyReturn {
    pub year: i16,
    pub total_return: f64,
}

/// Benchmark comparison over the same date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub ticker: String,
    pub total_return: f64,
    pub cagr: f64,
    /// Portfolio beta against the benchmark's daily returns.
    pub beta: f64,
    /// Portfolio total return minus benchmark total return.
    pub excess_return: f64,
}

/// Completed backtest. Created once at the end of a run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub snapshots: Vec<PortfolioSnapshot>,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub metrics: RiskMetrics,
    pub yearly_returns: Vec<YearlyReturn>,
    pub benchmark: Option<BenchmarkComparison>,
}

/// Per-ticker simulation state: fetched series, target weight, current
/// share count, and the last known usable close (stale-carry).
struct Holding {
    ticker: String,
    weight: f64,
    points: Vec<PricePoint>,
    cursor: usize,
    shares: f64,
    last_close: Option<f64>,
}

impl Holding {
    /// Move the cursor through every point dated at or before `date`,
    /// remembering the most recent usable close.
    fn advance_to(&mut self, date: Date) {
        while let Some(p) = self.points.get(self.cursor) {
            if p.date > date {
                break;
            }
            if is_usable(p.close) {
                self.last_close = Some(p.close);
            }
            self.cursor += 1;
        }
    }

    /// Close used to open the position: the last known close if the ticker
    /// traded on or before the first calendar day, otherwise its earliest
    /// usable close in range (a late-starting ticker on the union calendar).
    fn opening_close(&self) -> Option<f64> {
        self.last_close
            .or_else(|| self.points.iter().find(|p| is_usable(p.close)).map(|p| p.close))
    }

    fn market_value(&self) -> f64 {
        self.shares * self.last_close.unwrap_or(0.0)
    }
}

/// Run a historical backtest against the injected price provider.
///
/// Validation failures surface before any provider call; a single ticker
/// failing lookup or lacking data aborts the whole run (no partial
/// portfolios).
pub fn run_backtest<P: PriceProvider>(
    config: &BacktestConfig,
    provider: &P,
) -> Result<BacktestResult> {
    config.validate()?;
    let range = config.range();

    let mut holdings = Vec::with_capacity(config.allocation.len());
    for (ticker, weight) in config.allocation.entries_sorted() {
        let series = provider.price_history(ticker, range)?;
        let points: Vec<PricePoint> = series.usable_points(range).collect();
        if points.len() < 2 {
            return Err(InsufficientDataError {
                ticker: ticker.to_string(),
                usable_points: points.len(),
            }
            .into());
        }
        holdings.push(Holding {
            ticker: ticker.to_string(),
            weight,
            points,
            cursor: 0,
            shares: 0.0,
            last_close: None,
        });
    }

    // Holdings keep only usable in-range points, so the union is built from
    // real pricing days.
    let calendar = TradingCalendar::from_dates(
        holdings
            .iter()
            .flat_map(|h| h.points.iter().map(|p| p.date)),
    );
    debug!(
        tickers = holdings.len(),
        trading_days = calendar.len(),
        rebalancing = ?config.rebalancing,
        "starting backtest"
    );

    let mut snapshots: Vec<PortfolioSnapshot> = Vec::with_capacity(calendar.len());
    let mut last_rebalance: Option<Date> = None;

    for &date in calendar.dates() {
        for h in &mut holdings {
            h.advance_to(date);
        }

        if last_rebalance.is_none() {
            // Open positions at target weights on the first trading day
            for h in &mut holdings {
                let Some(open) = h.opening_close() else {
                    return Err(SimulationError::InvariantViolation(
                        "validated holding has no usable close",
                    ));
                };
                h.last_close = Some(open);
                h.shares = config.initial_capital * h.weight / open;
            }
            last_rebalance = Some(date);
        }

        let total: f64 = holdings.iter().map(Holding::market_value).sum();

        if let (Some(interval), Some(last)) = (config.rebalancing.interval_days(), last_rebalance)
            && (date - last).get_days() >= interval
        {
            rebalance(&mut holdings, total);
            last_rebalance = Some(date);
        }

        snapshots.push(PortfolioSnapshot {
            date,
            total_value: total,
            positions: holdings
                .iter()
                .map(|h| PositionSnapshot {
                    ticker: h.ticker.clone(),
                    shares: h.shares,
                    value: h.market_value(),
                })
                .collect(),
        });
    }

    let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
        // Validation guarantees >=2 usable points per ticker inside the range
        return Err(SimulationError::InvariantViolation(
            "backtest completed with an empty snapshot sequence",
        ));
    };

    let final_value = last.total_value;
    let total_return = (final_value - config.initial_capital) / config.initial_capital;
    let cagr = compound_annual_growth(config.initial_capital, final_value, first.date, last.date);

    let values: Vec<f64> = snapshots.iter().map(|s| s.total_value).collect();
    let returns = daily_returns(&values);

    let (benchmark, bench_returns) = match &config.benchmark {
        Some(ticker) => {
            let (cmp, bench_returns) =
                benchmark_comparison(ticker, provider, range, &returns, total_return)?;
            (Some(cmp), Some(bench_returns))
        }
        None => (None, None),
    };

    let metrics =
        compute_risk_metrics(&returns, bench_returns.as_deref(), Some(config.risk_free_rate));

    let yearly_returns = yearly_returns(&snapshots);

    debug!(final_value, total_return, "backtest complete");

    Ok(BacktestResult {
        snapshots,
        initial_capital: config.initial_capital,
        final_value,
        total_return,
        cagr,
        metrics,
        yearly_returns,
        benchmark,
    })
}

/// Pull every holding back to its target weight at current prices.
fn rebalance(holdings: &mut [Holding], total_value: f64) {
    for h in holdings {
        if let Some(close) = h.last_close
            && close > 0.0
        {
            h.shares = total_value * h.weight / close;
        }
    }
}

/// CAGR from actual elapsed calendar days (÷365), not trading-day counts.
fn compound_annual_growth(initial: f64, final_value: f64, start: Date, end: Date) -> f64 {
    let years = f64::from((end - start).get_days()) / 365.0;
    if years <= 0.0 || initial <= 0.0 || final_value <= 0.0 {
        return 0.0;
    }
    (final_value / initial).powf(1.0 / years) - 1.0
}

/// Per-calendar-year returns: each year measured from the last snapshot of
/// the previous year (or the first snapshot overall) to its own last
/// snapshot.
fn yearly_returns(snapshots: &[PortfolioSnapshot]) -> Vec<YearlyReturn> {
    let mut out = Vec::new();
    let Some(first) = snapshots.first() else {
        return out;
    };

    let mut year = first.date.year();
    let mut base = first.total_value;
    let mut last_in_year = first.total_value;

    for s in snapshots {
        if s.date.year() != year {
            if base > 0.0 {
                out.push(YearlyReturn {
                    year,
                    total_return: last_in_year / base - 1.0,
                });
            }
            year = s.date.year();
            base = last_in_year;
        }
        last_in_year = s.total_value;
    }
    if base > 0.0 {
        out.push(YearlyReturn {
            year,
            total_return: last_in_year / base - 1.0,
        });
    }
    out
}

fn benchmark_comparison<P: PriceProvider>(
    ticker: &str,
    provider: &P,
    range: DateRange,
    portfolio_returns: &[f64],
    portfolio_total_return: f64,
) -> Result<(BenchmarkComparison, Vec<f64>)> {
    let series = provider.price_history(ticker, range)?;
    let points: Vec<PricePoint> = series.usable_points(range).collect();
    if points.len() < 2 {
        return Err(InsufficientDataError {
            ticker: ticker.to_string(),
            usable_points: points.len(),
        }
        .into());
    }
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let bench_returns = daily_returns(&closes);

    let first = &points[0];
    let last = &points[points.len() - 1];
    let total_return = last.close / first.close - 1.0;
    let cagr = compound_annual_growth(first.close, last.close, first.date, last.date);

    let comparison = BenchmarkComparison {
        ticker: ticker.to_string(),
        total_return,
        cagr,
        beta: beta(portfolio_returns, &bench_returns),
        excess_return: portfolio_total_return - total_return,
    };
    Ok((comparison, bench_returns))
}
