//! Result validation.
//!
//! Turns a raw solver outcome into a typed `OptimizationResult`. An outcome is
//! accepted only if the solver reports convergence and the weights satisfy the
//! bounds, the budget and the return floor within tolerance.

use tracing::{info, warn};

use crate::allocation::{Allocation, WeightVector};
use crate::error::{PortfolioError, Result};
use crate::objective::{expected_return, risk};
use crate::problem::Problem;
use crate::solver::{RawSolution, SolveStatus};

/// Why an optimization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The constraints admit no allocation.
    Infeasible,
    /// Tolerances were not met within the iteration limit, or the final point
    /// violates a constraint.
    NonConvergence,
    /// Numerical breakdown (singular system, non-finite values).
    Numerical,
}

/// Terminal outcome of an optimization.
#[derive(Debug, Clone)]
pub enum OptimizationResult {
    /// A validated allocation.
    Success(Allocation),
    /// No usable allocation.
    Failure {
        reason: FailureReason,
        /// Solver diagnostic.
        message: String,
        /// Last solver iterate, for debugging only.
        last_iterate: Vec<f64>,
    },
}

impl OptimizationResult {
    /// True for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, OptimizationResult::Success(_))
    }

    /// The allocation, if the optimization succeeded.
    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            OptimizationResult::Success(a) => Some(a),
            OptimizationResult::Failure { .. } => None,
        }
    }

    /// Convert into a `Result`, mapping each failure reason to its error.
    pub fn into_result(self) -> Result<Allocation> {
        match self {
            OptimizationResult::Success(a) => Ok(a),
            OptimizationResult::Failure {
                reason,
                message,
                last_iterate,
            } => Err(match reason {
                FailureReason::Infeasible => PortfolioError::InfeasibleConstraint(message),
                FailureReason::NonConvergence => PortfolioError::NonConvergence {
                    message,
                    last_iterate,
                },
                FailureReason::Numerical => PortfolioError::NumericalError(message),
            }),
        }
    }
}

/// Validate a raw solver outcome against `problem` with tolerance `tol`.
pub fn validate(raw: RawSolution, problem: &Problem, tol: f64) -> OptimizationResult {
    let last_iterate: Vec<f64> = raw.weights.iter().copied().collect();

    let failure = |reason, message: String| {
        warn!(?reason, %message, "optimization failed");
        OptimizationResult::Failure {
            reason,
            message,
            last_iterate: last_iterate.clone(),
        }
    };

    match raw.status {
        SolveStatus::Optimal => {}
        SolveStatus::Infeasible => return failure(FailureReason::Infeasible, raw.message),
        SolveStatus::MaxIterations => {
            return failure(FailureReason::NonConvergence, raw.message)
        }
        SolveStatus::NumericalError | SolveStatus::Unknown => {
            return failure(FailureReason::Numerical, raw.message)
        }
    }

    if raw.weights.iter().any(|w| !w.is_finite()) {
        return failure(
            FailureReason::Numerical,
            format!("non-finite weights: solver reported '{}'", raw.message),
        );
    }

    let constraints = problem.constraints();
    let violations = constraints.violations(&raw.weights, tol);
    if let Some(worst) = violations
        .iter()
        .max_by(|a, b| a.amount.total_cmp(&b.amount))
    {
        return failure(
            FailureReason::NonConvergence,
            format!(
                "{} violated by {:.3e}: solver reported '{}'",
                worst.constraint, worst.amount, raw.message
            ),
        );
    }

    // Snap round-off just outside the box onto the bounds.
    let bounds = constraints.bounds();
    let weights = raw.weights.map(|w| w.clamp(bounds.lower, bounds.upper));

    let model = problem.model();
    let achieved_risk = risk(&weights, model.covariance());
    let allocation = Allocation {
        assets: model.assets().to_vec(),
        expected_return: expected_return(&weights, model.expected_returns()),
        achieved_risk,
        weights: WeightVector::new(weights),
        iterations: raw.iterations,
        method: raw.method,
    };

    info!(
        method = ?allocation.method,
        iterations = allocation.iterations,
        risk = allocation.achieved_risk,
        expected_return = allocation.expected_return,
        "optimization succeeded"
    );

    OptimizationResult::Success(allocation)
}
