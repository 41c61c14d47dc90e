//! Portfolio simulation and risk analytics library
//!
//! This crate provides the deterministic compute core behind portfolio
//! analysis: historical backtesting, risk metric calculation, and Monte
//! Carlo forward projection. It supports:
//! - Return statistics estimation from daily close series
//! - Historical backtests with configurable rebalancing and stale-price carry
//! - Risk metrics (volatility, Sharpe, Sortino, beta, max drawdown, VaR/CVaR)
//! - Seeded, parallel Monte Carlo projection with percentile bands
//!
//! Price data enters exclusively through the [`PriceProvider`] trait; the
//! core performs no I/O and keeps no caches, so every entry point is a pure
//! function of its inputs.
//!
//! ```ignore
//! use folio_core::{AllocationTarget, BacktestConfig, RebalanceFrequency, run_backtest};
//! use jiff::civil::date;
//!
//! let allocation = AllocationTarget::from_weights([("VTI", 0.6), ("BND", 0.4)]);
//! let config = BacktestConfig::new(allocation, date(2020, 1, 2), date(2024, 12, 31), 10_000.0)
//!     .with_rebalancing(RebalanceFrequency::Quarterly)
//!     .with_benchmark("SPY");
//! let result = run_backtest(&config, &provider)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod backtest;
pub mod calendar;
pub mod error;
pub mod monte_carlo;
pub mod provider;
pub mod risk;
pub mod series;
pub mod stats;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use backtest::{
    BacktestConfig, BacktestResult, BenchmarkComparison, PortfolioSnapshot, PositionSnapshot,
    RebalanceFrequency, YearlyReturn, run_backtest,
};
pub use calendar::TradingCalendar;
pub use error::{
    DataUnavailableError, InsufficientDataError, Result, SimulationError, ValidationError,
};
pub use monte_carlo::{
    DEFAULT_CONFIDENCE, DistributionRisk, FinalValueSummary, MAX_SIMULATIONS, MIN_SIMULATIONS,
    MonteCarloConfig, MonteCarloResult, OutcomeProbabilities, PercentileBand, project,
    run_monte_carlo,
};
pub use provider::{PriceProvider, StaticPrices};
pub use risk::{DEFAULT_RISK_FREE_RATE, RiskMetrics, compute_risk_metrics};
pub use series::{ALLOCATION_TOLERANCE, AllocationTarget, DateRange, PricePoint, PriceSeries};
pub use stats::{AssetStatistics, TRADING_DAYS_PER_YEAR};
