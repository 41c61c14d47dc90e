use std::fmt;

use jiff::civil::Date;

/// Errors for invalid caller input, surfaced before any simulation work begins.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The allocation target contains no tickers
    EmptyAllocation,
    /// Allocation weights do not sum to 1 within tolerance
    AllocationSum { sum: f64 },
    /// A single weight falls outside [0, 1]
    WeightOutOfRange { ticker: String, weight: f64 },
    /// Initial capital must be positive and finite
    NonPositiveCapital { capital: f64 },
    /// The requested date range is empty or inverted
    EmptyDateRange { start: Date, end: Date },
    /// Simulation count falls outside the supported bounds
    SimulationCountOutOfRange {
        count: usize,
        min: usize,
        max: usize,
    },
    /// The projection horizon must be positive and finite
    NonPositiveHorizon { years: f64 },
    /// VaR/CVaR confidence must lie strictly inside (0, 1)
    ConfidenceOutOfRange { confidence: f64 },
    /// A price series violated the strictly-increasing date invariant
    UnorderedPriceSeries { ticker: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyAllocation => {
                write!(f, "allocation target contains no tickers")
            }
            ValidationError::AllocationSum { sum } => {
                write!(f, "allocation weights sum to {sum} (must be 1.0 within tolerance)")
            }
            ValidationError::WeightOutOfRange { ticker, weight } => {
                write!(f, "weight {weight} for {ticker} is outside [0, 1]")
            }
            ValidationError::NonPositiveCapital { capital } => {
                write!(f, "initial capital {capital} must be positive")
            }
            ValidationError::EmptyDateRange { start, end } => {
                write!(f, "date range {start}..{end} is empty (start must precede end)")
            }
            ValidationError::SimulationCountOutOfRange { count, min, max } => {
                write!(f, "simulation count {count} is outside [{min}, {max}]")
            }
            ValidationError::NonPositiveHorizon { years } => {
                write!(f, "projection horizon {years} years must be positive")
            }
            ValidationError::ConfidenceOutOfRange { confidence } => {
                write!(f, "confidence level {confidence} is outside (0, 1)")
            }
            ValidationError::UnorderedPriceSeries { ticker } => {
                write!(f, "price series for {ticker} has non-increasing or duplicate dates")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A ticker lacks the price data needed for the requested computation.
#[derive(Debug, Clone, PartialEq)]
pub struct InsufficientDataError {
    pub ticker: String,
    /// Usable (positive, finite) price points remaining after filtering
    pub usable_points: usize,
}

impl fmt::Display for InsufficientDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} usable price points in range (need at least 2)",
            self.ticker, self.usable_points
        )
    }
}

impl std::error::Error for InsufficientDataError {}

/// The price-history collaborator could not supply data for a ticker.
///
/// Propagated unchanged through the core; retry and backoff policy belong
/// to the collaborator, never to the simulation core.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUnavailableError {
    pub ticker: String,
    pub reason: String,
}

impl DataUnavailableError {
    pub fn new(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DataUnavailableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "price data unavailable for {}: {}", self.ticker, self.reason)
    }
}

impl std::error::Error for DataUnavailableError {}

/// Top-level error for the simulation entry points.
///
/// `InvariantViolation` marks an internal bug (e.g. an empty snapshot
/// sequence at completion) and is deliberately distinct from the user-input
/// variants so callers can alert instead of rendering a user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Validation(ValidationError),
    InsufficientData(InsufficientDataError),
    DataUnavailable(DataUnavailableError),
    InvariantViolation(&'static str),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Validation(e) => write!(f, "{e}"),
            SimulationError::InsufficientData(e) => write!(f, "{e}"),
            SimulationError::DataUnavailable(e) => write!(f, "{e}"),
            SimulationError::InvariantViolation(msg) => {
                write!(f, "internal invariant violated: {msg}")
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Validation(e) => Some(e),
            SimulationError::InsufficientData(e) => Some(e),
            SimulationError::DataUnavailable(e) => Some(e),
            SimulationError::InvariantViolation(_) => None,
        }
    }
}

impl From<ValidationError> for SimulationError {
    fn from(e: ValidationError) -> Self {
        SimulationError::Validation(e)
    }
}

impl From<InsufficientDataError> for SimulationError {
    fn from(e: InsufficientDataError) -> Self {
        SimulationError::InsufficientData(e)
    }
}

impl From<DataUnavailableError> for SimulationError {
    fn from(e: DataUnavailableError) -> Self {
        SimulationError::DataUnavailable(e)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
