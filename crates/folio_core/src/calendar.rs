//! Shared trading-date index for multi-asset simulation.

use jiff::civil::Date;

use crate::series::{DateRange, PriceSeries};

/// The ordered set of trading dates a backtest steps through.
///
/// Built as the union of every ticker's dates inside the requested range,
/// so no asset's trading days are dropped. A ticker with no close on a
/// calendar day is valued by stale-carry in the simulator, never by
/// interpolation.
#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    dates: Vec<Date>,
}

impl TradingCalendar {
    /// Union of all series' dates within `range`, sorted and deduplicated.
    #[must_use]
    pub fn union(series: &[PriceSeries], range: DateRange) -> Self {
        Self::from_dates(
            series
                .iter()
                .flat_map(|s| s.points().iter().map(|p| p.date))
                .filter(|d| range.contains(*d)),
        )
    }

    /// Build directly from an unordered stream of dates.
    #[must_use]
    pub fn from_dates(dates: impl IntoIterator<Item = Date>) -> Self {
        let mut dates: Vec<Date> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<Date> {
        self.dates.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Date> {
        self.dates.last().copied()
    }
}
