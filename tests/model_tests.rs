//! End-to-end tests from price history to allocation.

use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use minvar::prelude::*;

const EPS: f64 = 1e-6;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// Deterministic daily history: constant drift plus a sine wave.
fn history(drift: f64, amplitude: f64, frequency: f64, phase: f64, days: usize) -> Vec<(NaiveDate, f64)> {
    let mut price = 100.0;
    let mut out = Vec::with_capacity(days);
    for day in 0..days {
        if day > 0 {
            price *= 1.0 + drift + amplitude * (frequency * day as f64 + phase).sin();
        }
        out.push((start() + Duration::days(day as i64), price));
    }
    out
}

fn prices(days: usize) -> PriceSeries {
    PriceSeries::align([
        ("BOND", history(0.0002, 0.003, 0.7, 0.0, days)),
        ("BLEND", history(0.0004, 0.005, 1.3, 0.5, days)),
        ("EQUITY", history(0.0006, 0.008, 2.1, 1.0, days)),
    ])
    .expect("valid prices")
}

fn target_between(model: &ReturnModel) -> f64 {
    let mu = model.expected_returns();
    0.5 * (mu.min() + mu.max())
}

#[test]
fn test_optimize_from_prices() {
    let prices = prices(300);
    let config = Config::default();
    let model = ReturnModel::from_prices(&prices, config.periods_per_year).unwrap();
    let target = target_between(&model);
    assert!(target > 0.0);

    let allocation = optimize(&prices, target, &config).expect("should solve");

    assert_eq!(allocation.assets, vec!["BOND", "BLEND", "EQUITY"]);
    assert_abs_diff_eq!(allocation.weights.sum(), 1.0, epsilon = EPS);
    for &w in allocation.weights.iter() {
        assert!(w >= 0.0 && w <= 1.0);
    }
    assert!(allocation.expected_return >= target - EPS);
    assert_abs_diff_eq!(
        allocation.achieved_risk,
        risk(allocation.weights.as_vector(), model.covariance()),
        epsilon = 1e-12
    );
}

#[test]
fn test_optimize_matches_problem() {
    let prices = prices(300);
    let config = Config::default();
    let model = ReturnModel::from_prices(&prices, config.periods_per_year).unwrap();
    let target = target_between(&model);

    let from_prices = optimize(&prices, target, &config).unwrap();
    let from_model = Problem::min_variance(model)
        .target_return(target)
        .solve()
        .unwrap();

    for (a, b) in from_prices.weights.iter().zip(from_model.weights.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_optimize_with_interior_point() {
    let prices = prices(300);
    let mut config = Config::default();
    config.solver.method = Method::InteriorPoint;
    let model = ReturnModel::from_prices(&prices, config.periods_per_year).unwrap();
    let target = target_between(&model);

    let interior = optimize(&prices, target, &config).expect("should solve");
    let sqp = optimize(&prices, target, &Config::default()).expect("should solve");

    assert_eq!(interior.method, Method::InteriorPoint);
    for (a, b) in interior.weights.iter().zip(sqp.weights.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn test_optimize_unreachable_target() {
    let prices = prices(300);
    let model = ReturnModel::from_prices(&prices, TRADING_DAYS_PER_YEAR).unwrap();
    let target = model.max_expected_return() + 0.05;

    match optimize(&prices, target, &Config::default()) {
        Err(PortfolioError::InfeasibleConstraint(message)) => {
            assert!(message.contains("minimum return"), "{}", message);
        }
        other => panic!("expected infeasible, got {:?}", other),
    }
}

#[test]
fn test_optimize_rejects_non_positive_target() {
    let prices = prices(30);
    for target in [0.0, -0.1, f64::NAN] {
        let result = optimize(&prices, target, &Config::default());
        assert!(
            matches!(result, Err(PortfolioError::InvalidInput(_))),
            "target {} accepted",
            target
        );
    }
}

#[test]
fn test_optimize_insufficient_history() {
    for days in [1, 2] {
        let result = optimize(&prices(days), 0.05, &Config::default());
        assert!(
            matches!(result, Err(PortfolioError::InsufficientData { .. })),
            "{} days: {:?}",
            days,
            result
        );
    }
}

#[test]
fn test_align_drops_missing_dates() {
    let full = history(0.0003, 0.004, 0.9, 0.0, 20);
    let mut gappy = history(0.0005, 0.006, 1.7, 0.3, 20);
    gappy.remove(5);
    gappy[10].1 = f64::NAN;

    let prices = PriceSeries::align([("A", full), ("B", gappy)]).unwrap();
    assert_eq!(prices.len(), 18);
    assert_eq!(prices.num_assets(), 2);
    assert!(!prices.dates().contains(&(start() + Duration::days(5))));
}

#[test]
fn test_single_asset_takes_everything() {
    let prices = PriceSeries::align([("ONLY", history(0.0004, 0.005, 1.1, 0.0, 60))]).unwrap();
    let model = ReturnModel::from_prices(&prices, TRADING_DAYS_PER_YEAR).unwrap();
    let target = 0.5 * model.expected_returns()[0];
    assert!(target > 0.0);

    let allocation = optimize(&prices, target, &Config::default()).unwrap();
    assert_abs_diff_eq!(allocation.weights[0], 1.0, epsilon = EPS);
    assert_eq!(allocation.weight("ONLY"), Some(allocation.weights[0]));
}
