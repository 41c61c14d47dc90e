//! Integration tests for the simulation core
//!
//! Tests are organized by topic:
//! - `backtest` - Historical simulation mechanics, rebalancing, validation
//! - `projection` - Monte Carlo determinism and distribution shape
//! - `risk_metrics` - The standalone metrics entry point

mod projection;

use jiff::civil::{Date, date};

use crate::provider::StaticPrices;
use crate::series::{PricePoint, PriceSeries};

/// Daily series starting at `start`, one point per consecutive calendar day.
pub(crate) fn daily_series(ticker: &str, start: Date, closes: &[f64]) -> PriceSeries {
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start.saturating_add(jiff::Span::new().days(i as i64)),
            close,
        })
        .collect();
    PriceSeries::new(ticker, points).unwrap()
}

/// Two-asset fixture used across the backtest tests:
/// AAA [100, 102, 101, 105] and BBB [50, 49, 51, 52] over four days.
pub(crate) fn two_asset_provider() -> StaticPrices {
    let start = date(2024, 1, 1);
    StaticPrices::new()
        .with_series(daily_series("AAA", start, &[100.0, 102.0, 101.0, 105.0]))
        .with_series(daily_series("BBB", start, &[50.0, 49.0, 51.0, 52.0]))
}
