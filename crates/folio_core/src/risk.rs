//! Risk metrics over daily fractional return series.
//!
//! Pure functions, no shared state. Every metric tolerates degenerate input
//! (empty or single-element series, zero variance) by returning 0 rather
//! than dividing by zero; callers never need to pre-screen series length.

use serde::{Deserialize, Serialize};

use crate::stats::{TRADING_DAYS_PER_YEAR, mean, sample_std_dev};

/// Default annualized risk-free rate when the caller does not supply one.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;

/// Annualized volatility: stdev of daily returns scaled by √252.
#[must_use]
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Sharpe ratio: (annualized mean return − risk-free rate) / annualized
/// volatility. 0 when the series is too short or volatility is 0.
#[must_use]
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let vol = annualized_volatility(returns);
    if vol == 0.0 {
        return 0.0;
    }
    let annual_mean = mean(returns) * TRADING_DAYS_PER_YEAR;
    (annual_mean - risk_free_rate) / vol
}

/// Sortino ratio: the Sharpe numerator divided by annualized downside
/// deviation over returns below `target` (0 for the standard form).
/// 0 when there is no downside.
#[must_use]
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, target: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq_sum: f64 = returns
        .iter()
        .filter(|&&r| r < target)
        .map(|r| (r - target) * (r - target))
        .sum();
    let downside_daily = (downside_sq_sum / returns.len() as f64).sqrt();
    let downside_annual = downside_daily * TRADING_DAYS_PER_YEAR.sqrt();
    if downside_annual == 0.0 {
        return 0.0;
    }
    let annual_mean = mean(returns) * TRADING_DAYS_PER_YEAR;
    (annual_mean - risk_free_rate) / downside_annual
}

/// Beta of a portfolio against a market series:
/// Cov(r_p, r_m) / Var(r_m) over the overlapping prefix of both series.
///
/// A shorter series truncates the comparison; that is documented behavior,
/// not an error. 0 when the overlap is shorter than 2 or market variance
/// is 0.
#[must_use]
pub fn beta(portfolio_returns: &[f64], market_returns: &[f64]) -> f64 {
    let n = portfolio_returns.len().min(market_returns.len());
    if n < 2 {
        return 0.0;
    }
    let p = &portfolio_returns[..n];
    let m = &market_returns[..n];
    let p_mean = mean(p);
    let m_mean = mean(m);

    let mut covariance = 0.0;
    let mut market_variance = 0.0;
    for i in 0..n {
        let dm = m[i] - m_mean;
        covariance += (p[i] - p_mean) * dm;
        market_variance += dm * dm;
    }
    if market_variance == 0.0 {
        return 0.0;
    }
    covariance / market_variance
}

/// Maximum drawdown of a value series: the largest `(peak - v) / peak` over
/// a chronological scan, as a positive fraction (0.25 = 25%).
#[must_use]
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Linearly interpolated percentile of a sorted slice, `p` in [0, 1].
/// 0 for an empty slice.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let frac = rank - lo as f64;
                sorted[lo] + (sorted[hi] - sorted[lo]) * frac
            }
        }
    }
}

/// Historical VaR at `confidence` (e.g. 0.95): the absolute value of the
/// return at the `(1 - confidence)` percentile of the sorted distribution.
/// 0 for fewer than two returns, like every other metric here.
#[must_use]
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    percentile(&sorted, 1.0 - confidence).abs()
}

/// Historical CVaR (expected shortfall) at `confidence`: the absolute value
/// of the mean of all returns at or below the VaR percentile.
/// 0 for fewer than two returns.
#[must_use]
pub fn historical_cvar(returns: &[f64], confidence: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let threshold = percentile(&sorted, 1.0 - confidence);
    let tail: Vec<f64> = sorted.iter().copied().take_while(|&r| r <= threshold).collect();
    if tail.is_empty() {
        return threshold.abs();
    }
    mean(&tail).abs()
}

/// Annualized volatility over each sliding window of `window` returns.
/// Empty when the series is shorter than the window or `window < 2`.
#[must_use]
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || returns.len() < window {
        return Vec::new();
    }
    returns
        .windows(window)
        .map(annualized_volatility)
        .collect()
}

/// The standard metric set computed over one return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    /// Present only when a benchmark series was supplied.
    pub beta: Option<f64>,
}

/// Compute the full metric set from daily fractional returns.
///
/// `risk_free_rate` defaults to [`DEFAULT_RISK_FREE_RATE`] when `None`.
/// Max drawdown is measured on the equity curve implied by compounding the
/// returns from 1.0.
#[must_use]
pub fn compute_risk_metrics(
    returns: &[f64],
    benchmark_returns: Option<&[f64]>,
    risk_free_rate: Option<f64>,
) -> RiskMetrics {
    let rf = risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE);

    let mut equity = Vec::with_capacity(returns.len() + 1);
    equity.push(1.0);
    let mut value = 1.0;
    for r in returns {
        value *= 1.0 + r;
        equity.push(value);
    }

    RiskMetrics {
        volatility: annualized_volatility(returns),
        sharpe_ratio: sharpe_ratio(returns, rf),
        sortino_ratio: sortino_ratio(returns, rf, 0.0),
        max_drawdown: max_drawdown(&equity),
        var_95: historical_var(returns, 0.95),
        cvar_95: historical_cvar(returns, 0.95),
        beta: benchmark_returns.map(|m| beta(returns, m)),
    }
}
