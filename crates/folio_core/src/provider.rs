//! The price-history collaborator boundary.
//!
//! [`PriceProvider`] is the core's only external interface. The core never
//! retries or caches a lookup; one failing ticker aborts the whole run and
//! the failure is propagated unchanged.

use rustc_hash::FxHashMap;

use crate::error::DataUnavailableError;
use crate::series::{DateRange, PriceSeries};

/// Supplies historical closes for a ticker over a date range.
pub trait PriceProvider {
    fn price_history(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<PriceSeries, DataUnavailableError>;
}

impl<F> PriceProvider for F
where
    F: Fn(&str, DateRange) -> Result<PriceSeries, DataUnavailableError>,
{
    fn price_history(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<PriceSeries, DataUnavailableError> {
        self(ticker, range)
    }
}

/// In-memory provider backed by pre-loaded series. Used by tests and
/// benchmarks; production callers wrap their data layer instead.
#[derive(Debug, Clone, Default)]
pub struct StaticPrices {
    series: FxHashMap<String, PriceSeries>,
}

impl StaticPrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    #[must_use]
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }
}

impl PriceProvider for StaticPrices {
    fn price_history(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<PriceSeries, DataUnavailableError> {
        self.series
            .get(ticker)
            .map(|s| s.slice(range))
            .ok_or_else(|| DataUnavailableError::new(ticker, "no series loaded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;

    #[test]
    fn test_static_prices_slices_to_range() {
        let d = jiff::civil::date;
        let series = PriceSeries::new(
            "AAA",
            vec![
                PricePoint { date: d(2024, 1, 1), close: 100.0 },
                PricePoint { date: d(2024, 2, 1), close: 101.0 },
                PricePoint { date: d(2024, 3, 1), close: 102.0 },
            ],
        )
        .unwrap();
        let provider = StaticPrices::new().with_series(series);

        let fetched = provider
            .price_history("AAA", DateRange::new(d(2024, 1, 15), d(2024, 2, 15)))
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched.points()[0].close, 101.0);

        let err = provider
            .price_history("BBB", DateRange::new(d(2024, 1, 1), d(2024, 2, 1)))
            .unwrap_err();
        assert_eq!(err.ticker, "BBB");
    }
}
