//! Monte Carlo projection through the full entry point: statistics are
//! estimated from provider history, then projected forward.

use jiff::civil::date;

use super::daily_series;
use crate::error::SimulationError;
use crate::monte_carlo::{MonteCarloConfig, MonteCarloResult, run_monte_carlo};
use crate::provider::StaticPrices;
use crate::series::{AllocationTarget, DateRange};

/// 300 days of history per ticker: steady growth with a deterministic wiggle
/// so estimated volatility is non-zero.
fn history_provider() -> StaticPrices {
    let start = date(2023, 1, 1);
    let wiggly: Vec<f64> = (0..300)
        .map(|i| 100.0 * 1.0005_f64.powi(i) * (1.0 + 0.01 * f64::from(i % 5)))
        .collect();
    let steady: Vec<f64> = (0..300).map(|i| 50.0 * 1.0002_f64.powi(i)).collect();
    StaticPrices::new()
        .with_series(daily_series("AAA", start, &wiggly))
        .with_series(daily_series("BBB", start, &steady))
}

fn config() -> MonteCarloConfig {
    let allocation = AllocationTarget::from_weights([("AAA", 0.6), ("BBB", 0.4)]);
    let lookback = DateRange::new(date(2023, 1, 1), date(2023, 12, 31));
    MonteCarloConfig::new(allocation, lookback, 1.0, 10_000.0)
        .with_simulations(250)
        .with_seed(7)
}

#[test]
fn test_end_to_end_projection_shape() {
    let result = run_monte_carlo(&config(), &history_provider()).unwrap();

    assert_eq!(result.simulations, 250);
    assert_eq!(result.days, 252);
    assert_eq!(result.bands.len(), 253);
    assert_eq!(result.bands[0].p50, 10_000.0);
    assert!(result.final_values.min <= result.final_values.median);
    assert!(result.final_values.median <= result.final_values.max);
    assert!(result.final_values.std_dev > 0.0);
    assert_eq!(result.risk.confidence, 0.95);
    assert!(result.risk.cvar >= result.risk.var);
}

#[test]
fn test_projection_is_reproducible() {
    let provider = history_provider();
    let a = run_monte_carlo(&config(), &provider).unwrap();
    let b = run_monte_carlo(&config(), &provider).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_constant_growth_history_compounds_deterministically() {
    // +1% every day: estimated volatility is zero, so every path is the
    // same compounding sequence
    let start = date(2023, 1, 1);
    let closes: Vec<f64> = (0..50).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
    let provider = StaticPrices::new().with_series(daily_series("AAA", start, &closes));

    let allocation = AllocationTarget::from_weights([("AAA", 1.0)]);
    let lookback = DateRange::new(date(2023, 1, 1), date(2023, 12, 31));
    let cfg = MonteCarloConfig::new(allocation, lookback, 0.1, 10_000.0).with_simulations(100);
    let result = run_monte_carlo(&cfg, &provider).unwrap();

    let days = result.days as i32;
    assert_eq!(days, 25);
    let expected = 10_000.0 * 1.01_f64.powi(days);
    assert!((result.final_values.median - expected).abs() < 1e-6);
    assert!((result.final_values.max - result.final_values.min).abs() < 1e-6);
    assert_eq!(result.probabilities.gain, 1.0);
    assert_eq!(result.probabilities.doubling, 0.0);
    assert_eq!(result.probabilities.drawdown_20, 0.0);
    assert_eq!(result.probabilities.halving, 0.0);
}

#[test]
fn test_result_serializes_round_trip() {
    let result = run_monte_carlo(&config(), &history_provider()).unwrap();
    let json = serde_json::to_string(&result).unwrap();
    // Bit-exact equality needs serde_json's float_roundtrip parsing
    let back: MonteCarloResult = serde_json::from_str(&json).unwrap();
    assert_eq!(result, back);
}

#[test]
fn test_short_lookback_is_insufficient_data() {
    let start = date(2023, 1, 1);
    let provider = StaticPrices::new()
        .with_series(daily_series("AAA", start, &[100.0]))
        .with_series(daily_series("BBB", start, &[50.0, 51.0]));

    let err = run_monte_carlo(&config(), &provider).unwrap_err();
    match err {
        SimulationError::InsufficientData(e) => assert_eq!(e.ticker, "AAA"),
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[test]
fn test_missing_ticker_is_unavailable() {
    let err = run_monte_carlo(&config(), &StaticPrices::new()).unwrap_err();
    assert!(matches!(err, SimulationError::DataUnavailable(_)));
}
