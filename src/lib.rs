//! # minvar
//!
//! Minimum-variance (Markowitz) portfolio allocation with a return floor.
//!
//! minvar turns historical prices into an annualized risk/return model and finds
//! the long-only, fully invested allocation with the smallest variance whose
//! expected return meets a minimum target.
//!
//! ## Quick Start
//!
//! ```ignore
//! use minvar::prelude::*;
//!
//! let prices = PriceSeries::align([
//!     ("SPY", spy_history),
//!     ("TLT", tlt_history),
//! ])?;
//!
//! let allocation = optimize(&prices, 0.08, &Config::default())?;
//! println!("{}", allocation);
//! ```
//!
//! ## Problem
//!
//! ```text
//! minimize    w' Σ w
//! subject to  μ' w >= target      (minimum return)
//!             sum(w) = 1          (fully invested)
//!             0 <= w <= 1         (long-only)
//! ```
//!
//! ## Architecture
//!
//! - **Return model**: simple returns, mean × 252, sample covariance × 252
//! - **Objective and constraints**: pure functions of the weights
//! - **SQP** with a dense active-set QP subproblem (default)
//! - **Clarabel** interior-point backend as an alternative
//! - **Validation**: solver output becomes a typed success or failure

pub mod allocation;
pub mod config;
pub mod error;
pub mod frontier;
pub mod model;
pub mod objective;
pub mod problem;
pub mod solver;
pub mod sparse;
pub mod validate;

use tracing::info;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use minvar::prelude::*;
/// ```
pub mod prelude {
    // Model
    pub use crate::model::{PriceSeries, ReturnModel, ReturnSeries, TRADING_DAYS_PER_YEAR};

    // Objective and constraints
    pub use crate::objective::{
        budget, expected_return, return_floor, risk, PortfolioConstraints, WeightBounds,
    };

    // Problem
    pub use crate::problem::{Problem, ProblemBuilder};

    // Solver
    pub use crate::solver::{Method, Settings, SolveStatus};

    // Results
    pub use crate::allocation::{Allocation, WeightVector};
    pub use crate::frontier::{efficient_frontier, FrontierPoint};
    pub use crate::validate::{FailureReason, OptimizationResult};

    // Configuration and errors
    pub use crate::config::Config;
    pub use crate::error::{PortfolioError, Result};
    pub use crate::optimize;
}

// Re-export main types at crate root
pub use allocation::Allocation;
pub use config::Config;
pub use error::{PortfolioError, Result};
pub use problem::Problem;

/// Compute the minimum-variance allocation for `prices` with an expected annual
/// return of at least `min_return` (a decimal fraction, e.g. `0.15` for 15%).
///
/// Fails with `InsufficientData` for too short a history,
/// `InfeasibleConstraint` when no allocation reaches `min_return`, and
/// `NonConvergence` when the solver stops early. Never falls back to a default
/// allocation.
pub fn optimize(
    prices: &model::PriceSeries,
    min_return: f64,
    config: &Config,
) -> Result<Allocation> {
    if !min_return.is_finite() || min_return <= 0.0 {
        return Err(PortfolioError::InvalidInput(format!(
            "minimum return must be a positive decimal fraction, got {}",
            min_return
        )));
    }

    info!(
        assets = prices.num_assets(),
        observations = prices.len(),
        min_return,
        "optimizing allocation"
    );

    let model = model::ReturnModel::from_prices(prices, config.periods_per_year)?;

    Problem::min_variance(model)
        .bounds(config.bounds)
        .target_return(min_return)
        .solve_with(&config.solver)
}
