//! Efficient frontier.
//!
//! Sweeps the return floor from the global minimum-variance portfolio up to the
//! highest achievable return and solves one problem per target.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocation::Allocation;
use crate::error::{PortfolioError, Result};
use crate::model::ReturnModel;
use crate::objective::{expected_return, PortfolioConstraints, WeightBounds};
use crate::problem::Problem;
use crate::solver::Settings;

/// One minimum-risk portfolio on the frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Return floor used (`None` for the global minimum-variance portfolio).
    pub target: Option<f64>,
    /// Expected return of the portfolio.
    pub expected_return: f64,
    /// Portfolio variance.
    pub risk: f64,
    /// Portfolio standard deviation.
    pub volatility: f64,
    /// Allocation weights in model order.
    pub weights: Vec<f64>,
}

impl FrontierPoint {
    fn from_allocation(target: Option<f64>, allocation: &Allocation) -> Self {
        FrontierPoint {
            target,
            expected_return: allocation.expected_return,
            risk: allocation.achieved_risk,
            volatility: allocation.volatility(),
            weights: allocation.weights.as_slice().to_vec(),
        }
    }
}

/// Compute `points` portfolios on the efficient frontier.
///
/// The first point is the global minimum-variance portfolio, the last one
/// targets the maximum achievable return.
pub fn efficient_frontier(
    model: &ReturnModel,
    bounds: WeightBounds,
    points: usize,
    settings: &Settings,
) -> Result<Vec<FrontierPoint>> {
    if points < 2 {
        return Err(PortfolioError::InvalidInput(format!(
            "an efficient frontier needs at least 2 points, got {}",
            points
        )));
    }
    bounds.validate()?;

    let min_variance = Problem::min_variance(model.clone())
        .bounds(bounds)
        .solve_with(settings)?;

    let best = PortfolioConstraints::new(model.expected_returns().clone(), None, bounds)
        .max_return_allocation()
        .ok_or_else(|| {
            PortfolioError::InfeasibleConstraint(
                "budget constraint cannot be met under the weight bounds".into(),
            )
        })?;
    let low = min_variance.expected_return;
    let high = expected_return(&best, model.expected_returns()).max(low);

    info!(points, low, high, "computing efficient frontier");

    let mut frontier = Vec::with_capacity(points);
    frontier.push(FrontierPoint::from_allocation(None, &min_variance));

    for k in 1..points {
        let target = low + (high - low) * k as f64 / (points - 1) as f64;
        let allocation = Problem::min_variance(model.clone())
            .bounds(bounds)
            .target_return(target)
            .solve_with(settings)?;
        frontier.push(FrontierPoint::from_allocation(Some(target), &allocation));
    }

    Ok(frontier)
}
