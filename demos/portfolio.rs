//! Portfolio Optimization Example
//!
//! Minimum-variance allocation over four assets:
//!
//! minimize    w' Σ w                (minimize risk)
//! subject to  μ' w >= target        (minimum return)
//!             sum(w) = 1            (fully invested)
//!             0 <= w <= 1           (long-only)
//!
//! Run with `RUST_LOG=minvar=debug` to see solver iterations.

use minvar::prelude::*;
use nalgebra::{DMatrix, DVector};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Portfolio Optimization ===\n");

    // 4 assets with different risk/return profiles
    #[rustfmt::skip]
    let sigma = DMatrix::from_row_slice(4, 4, &[
        0.04,  0.01,  0.00, -0.01,
        0.01,  0.03,  0.00,  0.00,
        0.00,  0.00,  0.02,  0.00,
        -0.01,  0.00,  0.00,  0.01,
    ]);
    let model = ReturnModel::new(
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        DVector::from_vec(vec![0.12, 0.10, 0.07, 0.05]),
        sigma,
    )?;

    println!("Expected returns: [12%, 10%, 7%, 5%]");
    println!("Target return: 9%\n");

    let allocation = Problem::min_variance(model.clone())
        .target_return(0.09)
        .solve()?;
    println!("{}", allocation);
    println!(
        "Sharpe ratio: {:.4}",
        allocation.expected_return / allocation.volatility()
    );

    // Same problem through the interior-point backend
    let settings = Settings {
        method: Method::InteriorPoint,
        ..Settings::default()
    };
    let interior = Problem::min_variance(model.clone())
        .target_return(0.09)
        .solve_with(&settings)?;
    println!("\nInterior point ({} iterations):", interior.iterations);
    for (asset, weight) in interior.iter() {
        println!("  Asset {}: {:.2}%", asset, weight * 100.0);
    }

    // Efficient frontier
    println!("\n--- Efficient Frontier ---\n");
    for point in efficient_frontier(&model, WeightBounds::long_only(), 5, &Settings::default())? {
        println!(
            "  Return: {:.2}%  →  Risk: {:.2}%",
            point.expected_return * 100.0,
            point.volatility * 100.0
        );
    }

    // Unreachable target
    println!("\n--- Infeasible Target ---\n");
    match Problem::min_variance(model).target_return(0.15).solve() {
        Err(PortfolioError::InfeasibleConstraint(message)) => println!("  {}", message),
        other => println!("  unexpected: {:?}", other),
    }

    Ok(())
}
