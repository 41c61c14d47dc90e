//! Return statistics estimation from historical price series.

use serde::{Deserialize, Serialize};

use crate::error::InsufficientDataError;
use crate::series::{PriceSeries, is_usable};

/// Trading-day convention used to annualize daily figures everywhere in the
/// core. Every component divides or multiplies by this single constant.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily simple returns `(p_t - p_{t-1}) / p_{t-1}` from a close series.
///
/// Windows with a non-positive previous close are skipped so a bad print
/// cannot produce an infinite return.
#[must_use]
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    if closes.len() < 2 {
        return Vec::new();
    }
    closes
        .windows(2)
        .filter_map(|w| {
            if is_usable(w[0]) {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        })
        .collect()
}

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n-1) standard deviation; 0 for fewer than two values.
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Annualized return statistics for a single asset.
///
/// Derived and immutable; recomputed per request. The core keeps no caches,
/// so estimation is deterministic and parallel-safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub ticker: String,
    pub annualized_mean_return: f64,
    pub annualized_volatility: f64,
}

impl AssetStatistics {
    /// Estimate from a price series.
    ///
    /// Non-positive and non-finite closes are dropped first; fewer than two
    /// usable points is an [`InsufficientDataError`] naming the ticker.
    pub fn estimate(series: &PriceSeries) -> Result<Self, InsufficientDataError> {
        let closes: Vec<f64> = series
            .points()
            .iter()
            .map(|p| p.close)
            .filter(|c| is_usable(*c))
            .collect();
        if closes.len() < 2 {
            return Err(InsufficientDataError {
                ticker: series.ticker().to_string(),
                usable_points: closes.len(),
            });
        }
        let returns = daily_returns(&closes);
        Ok(Self {
            ticker: series.ticker().to_string(),
            annualized_mean_return: mean(&returns) * TRADING_DAYS_PER_YEAR,
            annualized_volatility: sample_std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt(),
        })
    }

    /// Construct directly from annualized figures (projection inputs and tests).
    #[must_use]
    pub fn from_annualized(ticker: impl Into<String>, mean_return: f64, volatility: f64) -> Self {
        Self {
            ticker: ticker.into(),
            annualized_mean_return: mean_return,
            annualized_volatility: volatility,
        }
    }

    #[must_use]
    pub fn daily_mean(&self) -> f64 {
        self.annualized_mean_return / TRADING_DAYS_PER_YEAR
    }

    #[must_use]
    pub fn daily_volatility(&self) -> f64 {
        self.annualized_volatility / TRADING_DAYS_PER_YEAR.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;

    fn series_from_closes(ticker: &str, closes: &[f64]) -> PriceSeries {
        let start = jiff::civil::date(2024, 1, 1);
        PriceSeries::new(
            ticker,
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start.saturating_add(jiff::Span::new().days(i as i64)),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_daily_returns_basic() {
        let returns = daily_returns(&[100.0, 105.0, 103.0, 110.0]);
        assert_eq!(returns.len(), 3);
        assert!((returns[0] - 0.05).abs() < 1e-12);
        assert!((returns[1] - (-2.0 / 105.0)).abs() < 1e-12);
    }

    #[test]
    fn test_daily_returns_skips_bad_base() {
        // Window anchored on a zero close is dropped rather than dividing by zero
        let returns = daily_returns(&[100.0, 0.0, 110.0]);
        assert_eq!(returns.len(), 1);
        assert!((returns[0] - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_annualization() {
        // Constant +1% daily return: zero volatility, mean of 0.01 * 252
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let stats = AssetStatistics::estimate(&series_from_closes("AAA", &closes)).unwrap();
        assert!((stats.annualized_mean_return - 0.01 * TRADING_DAYS_PER_YEAR).abs() < 1e-9);
        assert!(stats.annualized_volatility < 1e-9);
        assert!((stats.daily_mean() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_insufficient_data() {
        let err = AssetStatistics::estimate(&series_from_closes("AAA", &[100.0])).unwrap_err();
        assert_eq!(err.ticker, "AAA");
        assert_eq!(err.usable_points, 1);

        // Filtering can push a series below the threshold
        let err =
            AssetStatistics::estimate(&series_from_closes("BBB", &[100.0, -1.0, 0.0])).unwrap_err();
        assert_eq!(err.usable_points, 1);
    }

    #[test]
    fn test_sample_std_dev_short_series() {
        assert_eq!(sample_std_dev(&[]), 0.0);
        assert_eq!(sample_std_dev(&[0.01]), 0.0);
    }
}
