//! Price series and allocation targets consumed by the simulation core.

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tolerance for the sum-to-one check on allocation weights.
pub const ALLOCATION_TOLERANCE: f64 = 1e-3;

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: Date,
    pub close: f64,
}

/// Historical closes for one ticker, strictly ordered by date.
///
/// The series is owned by the external price provider and read-only to the
/// core. Construction enforces the ordering invariant; non-positive closes
/// are kept here and filtered where returns are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a series, rejecting non-increasing or duplicate dates.
    pub fn new(
        ticker: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> Result<Self, ValidationError> {
        let ticker = ticker.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ValidationError::UnorderedPriceSeries { ticker });
            }
        }
        Ok(Self { ticker, points })
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sub-series restricted to `range` (inclusive on both ends).
    #[must_use]
    pub fn slice(&self, range: DateRange) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| range.contains(p.date))
                .copied()
                .collect(),
        }
    }

    /// Points inside `range` with a usable (positive, finite) close.
    pub fn usable_points(&self, range: DateRange) -> impl Iterator<Item = PricePoint> + '_ {
        self.points
            .iter()
            .filter(move |p| range.contains(p.date) && is_usable(p.close))
            .copied()
    }
}

#[inline]
#[must_use]
pub(crate) fn is_usable(close: f64) -> bool {
    close.is_finite() && close > 0.0
}

/// An inclusive calendar interval with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start >= self.end {
            return Err(ValidationError::EmptyDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Target portfolio weights by ticker.
///
/// Weights must each lie in [0, 1] and sum to 1 within
/// [`ALLOCATION_TOLERANCE`]. Violations are validation errors; the target is
/// never silently normalized. Iteration order of the underlying map is not
/// observable: every consumer goes through the sorted views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationTarget {
    weights: FxHashMap<String, f64>,
}

impl AllocationTarget {
    /// Build a target from (ticker, weight) pairs without validating.
    /// Call [`AllocationTarget::validate`] (the entry points do) before use.
    pub fn from_weights<T, I>(weights: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = (T, f64)>,
    {
        Self {
            weights: weights
                .into_iter()
                .map(|(t, w)| (t.into(), w))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weights.is_empty() {
            return Err(ValidationError::EmptyAllocation);
        }
        for (ticker, &weight) in &self.weights {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(ValidationError::WeightOutOfRange {
                    ticker: ticker.clone(),
                    weight,
                });
            }
        }
        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > ALLOCATION_TOLERANCE {
            return Err(ValidationError::AllocationSum { sum });
        }
        Ok(())
    }

    #[must_use]
    pub fn weight(&self, ticker: &str) -> Option<f64> {
        self.weights.get(ticker).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// (ticker, weight) pairs in sorted ticker order.
    ///
    /// Sorting makes every order-sensitive consumer (RNG draw order, output
    /// vectors) deterministic across process invocations.
    #[must_use]
    pub fn entries_sorted(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .weights
            .iter()
            .map(|(t, &w)| (t.as_str(), w))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
