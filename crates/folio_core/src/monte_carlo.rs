//! Monte Carlo forward projection.
//!
//! Simulates daily portfolio returns from annualized per-asset statistics:
//! each asset contributes `weight * (mu + sigma * z)` per trading day with
//! `z` drawn from a standard normal, and the portfolio value compounds the
//! weighted sum. Paths are independent and carry their own seeded RNG, so
//! results are bit-identical for a given seed whether paths run in parallel
//! or sequentially.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DataUnavailableError, Result, SimulationError, ValidationError};
use crate::provider::PriceProvider;
use crate::risk::{historical_cvar, historical_var, percentile};
use crate::series::{AllocationTarget, DateRange};
use crate::stats::{AssetStatistics, TRADING_DAYS_PER_YEAR, mean, sample_std_dev};

/// Bounds on the number of simulated paths per run.
pub const MIN_SIMULATIONS: usize = 100;
pub const MAX_SIMULATIONS: usize = 50_000;

/// Confidence level used for distribution VaR/CVaR unless overridden.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Projection parameters. `lookback` is the historical window statistics
/// are estimated from; `seed` makes the whole run reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub allocation: AllocationTarget,
    pub lookback: DateRange,
    pub horizon_years: f64,
    pub simulations: usize,
    pub initial_capital: f64,
    pub seed: u64,
    /// VaR/CVaR confidence level for the result's risk block.
    pub confidence: f64,
}

impl MonteCarloConfig {
    #[must_use]
    pub fn new(
        allocation: AllocationTarget,
        lookback: DateRange,
        horizon_years: f64,
        initial_capital: f64,
    ) -> Self {
        Self {
            allocation,
            lookback,
            horizon_years,
            simulations: 1_000,
            initial_capital,
            seed: 0,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.simulations = simulations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.allocation.validate()?;
        self.lookback.validate()?;
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ValidationError::NonPositiveCapital {
                capital: self.initial_capital,
            });
        }
        if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&self.simulations) {
            return Err(ValidationError::SimulationCountOutOfRange {
                count: self.simulations,
                min: MIN_SIMULATIONS,
                max: MAX_SIMULATIONS,
            });
        }
        if !self.horizon_years.is_finite() || self.horizon_years <= 0.0 {
            return Err(ValidationError::NonPositiveHorizon {
                years: self.horizon_years,
            });
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ValidationError::ConfidenceOutOfRange {
                confidence: self.confidence,
            });
        }
        Ok(())
    }

    /// Simulated trading days for the configured horizon, at least 1.
    #[must_use]
    pub fn horizon_days(&self) -> usize {
        ((self.horizon_years * TRADING_DAYS_PER_YEAR).round() as usize).max(1)
    }
}

/// Portfolio value percentiles across all paths at one simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    /// Trading days from the start; day 0 is the initial capital.
    pub day: usize,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Summary of the final-value distribution, including its five headline
/// percentiles (`p50` is also exposed as `median`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalValueSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Path-count fractions for headline outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    /// Fraction of paths ending above the initial capital.
    pub gain: f64,
    /// Fraction of paths ending at or above twice the initial capital.
    pub doubling: f64,
    /// Fraction of paths ending at or below 80% of the initial capital.
    pub drawdown_20: f64,
    /// Fraction of paths ending at or below half the initial capital.
    pub halving: f64,
}

/// Risk figures over the distribution of per-path total returns, at the
/// configured confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionRisk {
    pub confidence: f64,
    /// Standard deviation of whole-horizon total returns, not annualized.
    pub volatility: f64,
    pub var: f64,
    pub cvar: f64,
}

/// Completed projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub simulations: usize,
    pub days: usize,
    pub initial_capital: f64,
    pub seed: u64,
    /// One band per simulated day, day 0 through the horizon.
    pub bands: Vec<PercentileBand>,
    pub final_values: FinalValueSummary,
    pub probabilities: OutcomeProbabilities,
    pub risk: DistributionRisk,
}

/// Per-asset daily model derived from annualized statistics.
#[derive(Debug, Clone, Copy)]
struct AssetModel {
    weight: f64,
    mu_daily: f64,
    sigma_daily: f64,
}

/// Estimate statistics over the lookback window and project forward.
pub fn run_monte_carlo<P: PriceProvider>(
    config: &MonteCarloConfig,
    provider: &P,
) -> Result<MonteCarloResult> {
    config.validate()?;

    let mut statistics = Vec::with_capacity(config.allocation.len());
    for (ticker, _) in config.allocation.entries_sorted() {
        let series = provider.price_history(ticker, config.lookback)?;
        let in_range = series.slice(config.lookback);
        statistics.push(AssetStatistics::estimate(&in_range)?);
    }
    project(config, &statistics)
}

/// Project forward from pre-computed statistics.
///
/// Every allocated ticker must have a matching entry in `statistics`; a
/// missing one is reported as unavailable data rather than silently given
/// zero drift.
pub fn project(
    config: &MonteCarloConfig,
    statistics: &[AssetStatistics],
) -> Result<MonteCarloResult> {
    config.validate()?;

    let mut models = Vec::with_capacity(config.allocation.len());
    for (ticker, weight) in config.allocation.entries_sorted() {
        let stats = statistics
            .iter()
            .find(|s| s.ticker == ticker)
            .ok_or_else(|| DataUnavailableError::new(ticker, "no statistics supplied"))?;
        models.push(AssetModel {
            weight,
            mu_daily: stats.daily_mean(),
            sigma_daily: stats.daily_volatility(),
        });
    }

    let days = config.horizon_days();
    debug!(
        simulations = config.simulations,
        days,
        seed = config.seed,
        "starting projection"
    );

    let paths = simulate_paths(&models, config, days);

    let result = summarize(&paths, config, days)?;
    debug!(median_final = result.final_values.median, "projection complete");
    Ok(result)
}

#[cfg(feature = "parallel")]
fn simulate_paths(models: &[AssetModel], config: &MonteCarloConfig, days: usize) -> Vec<Vec<f64>> {
    (0..config.simulations)
        .into_par_iter()
        .map(|i| simulate_path(models, config.initial_capital, days, path_seed(config.seed, i)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn simulate_paths(models: &[AssetModel], config: &MonteCarloConfig, days: usize) -> Vec<Vec<f64>> {
    (0..config.simulations)
        .map(|i| simulate_path(models, config.initial_capital, days, path_seed(config.seed, i)))
        .collect()
}

/// SplitMix64 fold of the master seed and path index. Each path gets an
/// independent, reproducible stream regardless of execution order.
fn path_seed(master: u64, path: usize) -> u64 {
    let mut z = master.wrapping_add((path as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// One value path of `days + 1` points, starting at the initial capital.
///
/// Assets are visited in sorted ticker order, so draw order is stable and
/// the path depends only on its seed.
fn simulate_path(models: &[AssetModel], initial_capital: f64, days: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut path = Vec::with_capacity(days + 1);
    let mut value = initial_capital;
    path.push(value);

    for _ in 0..days {
        let mut day_return = 0.0;
        for m in models {
            let z: f64 = rng.sample(StandardNormal);
            day_return += m.weight * (m.mu_daily + m.sigma_daily * z);
        }
        value *= 1.0 + day_return;
        path.push(value);
    }
    path
}

fn summarize(paths: &[Vec<f64>], config: &MonteCarloConfig, days: usize) -> Result<MonteCarloResult> {
    if paths.is_empty() {
        return Err(SimulationError::InvariantViolation(
            "projection produced no paths",
        ));
    }

    let mut bands = Vec::with_capacity(days + 1);
    let mut column = Vec::with_capacity(paths.len());
    for day in 0..=days {
        column.clear();
        column.extend(paths.iter().map(|p| p[day]));
        column.sort_unstable_by(f64::total_cmp);
        bands.push(PercentileBand {
            day,
            p10: percentile(&column, 0.10),
            p25: percentile(&column, 0.25),
            p50: percentile(&column, 0.50),
            p75: percentile(&column, 0.75),
            p90: percentile(&column, 0.90),
        });
    }

    let mut finals: Vec<f64> = paths.iter().map(|p| p[days]).collect();
    finals.sort_unstable_by(f64::total_cmp);

    let n = finals.len() as f64;
    let final_values = FinalValueSummary {
        mean: mean(&finals),
        median: percentile(&finals, 0.50),
        min: finals[0],
        max: finals[finals.len() - 1],
        std_dev: sample_std_dev(&finals),
        p10: percentile(&finals, 0.10),
        p25: percentile(&finals, 0.25),
        p75: percentile(&finals, 0.75),
        p90: percentile(&finals, 0.90),
    };

    let capital = config.initial_capital;
    let probabilities = OutcomeProbabilities {
        gain: finals.iter().filter(|&&v| v > capital).count() as f64 / n,
        doubling: finals.iter().filter(|&&v| v >= 2.0 * capital).count() as f64 / n,
        drawdown_20: finals.iter().filter(|&&v| v <= 0.8 * capital).count() as f64 / n,
        halving: finals.iter().filter(|&&v| v <= 0.5 * capital).count() as f64 / n,
    };

    let total_returns: Vec<f64> = finals.iter().map(|v| v / capital - 1.0).collect();
    let risk = DistributionRisk {
        confidence: config.confidence,
        volatility: sample_std_dev(&total_returns),
        var: historical_var(&total_returns, config.confidence),
        cvar: historical_cvar(&total_returns, config.confidence),
    };

    Ok(MonteCarloResult {
        simulations: paths.len(),
        days,
        initial_capital: capital,
        seed: config.seed,
        bands,
        final_values,
        probabilities,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn config() -> MonteCarloConfig {
        let allocation = AllocationTarget::from_weights([("AAA", 0.6), ("BBB", 0.4)]);
        let lookback = DateRange::new(date(2020, 1, 1), date(2024, 12, 31));
        MonteCarloConfig::new(allocation, lookback, 1.0, 10_000.0)
            .with_simulations(200)
            .with_seed(42)
    }

    fn statistics() -> Vec<AssetStatistics> {
        vec![
            AssetStatistics::from_annualized("AAA", 0.08, 0.18),
            AssetStatistics::from_annualized("BBB", 0.04, 0.06),
        ]
    }

    #[test]
    fn test_horizon_days() {
        assert_eq!(config().horizon_days(), 252);
        let half = MonteCarloConfig { horizon_years: 0.5, ..config() };
        assert_eq!(half.horizon_days(), 126);
        let tiny = MonteCarloConfig { horizon_years: 0.001, ..config() };
        assert_eq!(tiny.horizon_days(), 1);
    }

    #[test]
    fn test_simulation_count_bounds() {
        let low = config().with_simulations(MIN_SIMULATIONS - 1);
        assert!(matches!(
            low.validate(),
            Err(ValidationError::SimulationCountOutOfRange { .. })
        ));
        let high = config().with_simulations(MAX_SIMULATIONS + 1);
        assert!(high.validate().is_err());
        assert!(config().with_simulations(MIN_SIMULATIONS).validate().is_ok());
    }

    #[test]
    fn test_horizon_must_be_positive() {
        let cfg = MonteCarloConfig { horizon_years: 0.0, ..config() };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::NonPositiveHorizon { .. })
        ));
    }

    #[test]
    fn test_missing_statistics_reported() {
        let err = project(&config(), &statistics()[..1]).unwrap_err();
        assert!(matches!(err, SimulationError::DataUnavailable(_)));
    }

    #[test]
    fn test_zero_volatility_is_deterministic_compounding() {
        let stats = vec![
            AssetStatistics::from_annualized("AAA", 0.0504, 0.0),
            AssetStatistics::from_annualized("BBB", 0.0504, 0.0),
        ];
        let cfg = config();
        let result = project(&cfg, &stats).unwrap();

        // Every path compounds the same 0.0002 daily return
        let daily = 0.0504 / TRADING_DAYS_PER_YEAR;
        let expected = 10_000.0 * (1.0 + daily).powi(252);
        assert!((result.final_values.median - expected).abs() < 1e-6);
        assert!((result.final_values.min - result.final_values.max).abs() < 1e-6);
        let last = result.bands.last().unwrap();
        assert!((last.p10 - last.p90).abs() < 1e-6);
        assert!((last.p50 - expected).abs() < 1e-6);
        assert_eq!(result.probabilities.gain, 1.0);
        assert_eq!(result.probabilities.drawdown_20, 0.0);
        assert_eq!(result.probabilities.halving, 0.0);
        assert!(result.risk.volatility < 1e-12);
    }

    #[test]
    fn test_severe_loss_probabilities() {
        // Deterministic decay: every path ends at e^-0.9 ≈ 0.41x capital
        let stats = vec![
            AssetStatistics::from_annualized("AAA", -0.9, 0.0),
            AssetStatistics::from_annualized("BBB", -0.9, 0.0),
        ];
        let result = project(&config(), &stats).unwrap();

        assert!(result.final_values.max < 0.5 * 10_000.0);
        assert_eq!(result.probabilities.gain, 0.0);
        assert_eq!(result.probabilities.doubling, 0.0);
        assert_eq!(result.probabilities.drawdown_20, 1.0);
        assert_eq!(result.probabilities.halving, 1.0);
    }

    #[test]
    fn test_confidence_is_configurable() {
        assert_eq!(config().confidence, 0.95);
        assert!(config().with_confidence(0.0).validate().is_err());
        assert!(config().with_confidence(1.0).validate().is_err());
        assert!(matches!(
            config().with_confidence(f64::NAN).validate(),
            Err(ValidationError::ConfidenceOutOfRange { .. })
        ));

        let narrow = project(&config().with_confidence(0.99), &statistics()).unwrap();
        let wide = project(&config().with_confidence(0.90), &statistics()).unwrap();
        assert_eq!(narrow.risk.confidence, 0.99);
        // A deeper tail cutoff cannot report a smaller loss
        assert!(narrow.risk.var >= wide.risk.var);
    }

    #[test]
    fn test_final_summary_matches_last_band() {
        let result = project(&config(), &statistics()).unwrap();
        let last = result.bands.last().unwrap();
        assert_eq!(result.final_values.p10, last.p10);
        assert_eq!(result.final_values.p25, last.p25);
        assert_eq!(result.final_values.median, last.p50);
        assert_eq!(result.final_values.p75, last.p75);
        assert_eq!(result.final_values.p90, last.p90);
    }

    #[test]
    fn test_same_seed_identical_results() {
        let a = project(&config(), &statistics()).unwrap();
        let b = project(&config(), &statistics()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = project(&config(), &statistics()).unwrap();
        let b = project(&config().with_seed(43), &statistics()).unwrap();
        assert_ne!(a.final_values.median, b.final_values.median);
    }

    #[test]
    fn test_bands_are_ordered() {
        let result = project(&config(), &statistics()).unwrap();
        assert_eq!(result.bands.len(), result.days + 1);
        assert_eq!(result.bands[0].p10, 10_000.0);
        assert_eq!(result.bands[0].p90, 10_000.0);
        for band in &result.bands {
            assert!(band.p10 <= band.p25);
            assert!(band.p25 <= band.p50);
            assert!(band.p50 <= band.p75);
            assert!(band.p75 <= band.p90);
        }
    }

    #[test]
    fn test_probabilities_are_fractions() {
        let result = project(&config(), &statistics()).unwrap();
        for p in [
            result.probabilities.gain,
            result.probabilities.doubling,
            result.probabilities.drawdown_20,
            result.probabilities.halving,
        ] {
            assert!((0.0..=1.0).contains(&p));
        }
        assert!(result.final_values.min <= result.final_values.median);
        assert!(result.final_values.median <= result.final_values.max);
    }
}
