//! Solver interface for minvar.
//!
//! This module provides:
//! - A dense active-set QP solver used for SQP subproblems
//! - The SQP driver (default method)
//! - Matrix stuffing and Clarabel integration (interior-point method)

pub mod clarabel;
pub mod qp;
pub mod sqp;
pub mod stuffing;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

pub use self::clarabel::solve as solve_interior_point;
pub use qp::{ActiveSetQp, QpSolution, QpStatus};
pub use sqp::solve as solve_sqp;
pub use stuffing::{stuff_problem, ConeDims, StuffedProblem};

/// Algorithm used to solve the allocation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Sequential quadratic programming with an active-set QP subproblem.
    #[default]
    Sqp,
    /// Clarabel interior-point conic solver.
    InteriorPoint,
}

/// Solution status reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Tolerances met.
    Optimal,
    /// The constraints admit no solution.
    Infeasible,
    /// Iteration (or time) limit reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Solution method.
    pub method: Method,
    /// Maximum outer iterations (SQP) or interior-point iterations (Clarabel).
    pub max_iter: u32,
    /// Maximum active-set iterations per QP subproblem.
    pub max_qp_iter: u32,
    /// SQP stops once the step infinity-norm falls below this.
    pub step_tol: f64,
    /// Constraint violation accepted by the solver at convergence.
    pub feasibility_tol: f64,
    /// Ridge added to the Hessian so KKT systems stay nonsingular.
    pub regularization: f64,
    /// Tolerance used by the result validator.
    pub validation_tol: f64,
    /// Print Clarabel output.
    pub verbose: bool,
    /// Clarabel time limit in seconds (`None` for no limit).
    pub time_limit: Option<f64>,
    /// Clarabel absolute duality-gap tolerance.
    pub tol_gap_abs: f64,
    /// Clarabel relative duality-gap tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            method: Method::Sqp,
            max_iter: 100,
            max_qp_iter: 500,
            step_tol: 1e-9,
            feasibility_tol: 1e-9,
            regularization: 1e-10,
            validation_tol: 1e-6,
            verbose: false,
            time_limit: None,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

impl Settings {
    /// Check that every tolerance and the regularization are finite and
    /// non-negative, and that a time limit, if set, is not negative.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("step_tol", self.step_tol),
            ("feasibility_tol", self.feasibility_tol),
            ("regularization", self.regularization),
            ("validation_tol", self.validation_tol),
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
        ];
        if let Some((name, value)) = fields
            .iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return Err(PortfolioError::InvalidInput(format!(
                "solver setting {} must be finite and non-negative, got {}",
                name, value
            )));
        }

        if let Some(limit) = self.time_limit {
            if limit.is_nan() || limit < 0.0 {
                return Err(PortfolioError::InvalidInput(format!(
                    "time limit must be non-negative, got {}",
                    limit
                )));
            }
        }

        Ok(())
    }
}

/// Raw outcome of a solver run, before validation.
#[derive(Debug, Clone)]
pub struct RawSolution {
    /// Method that produced this outcome.
    pub method: Method,
    /// Termination status.
    pub status: SolveStatus,
    /// Final (or last) iterate.
    pub weights: DVector<f64>,
    /// Objective value at `weights`.
    pub objective: f64,
    /// Iterations performed.
    pub iterations: u32,
    /// Diagnostic message.
    pub message: String,
}

impl RawSolution {
    /// True if the solver reported convergence.
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.method, Method::Sqp);
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 100);
        assert!(settings.time_limit.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let negative_ridge = Settings {
            regularization: -1e-3,
            ..Settings::default()
        };
        assert!(matches!(
            negative_ridge.validate(),
            Err(PortfolioError::InvalidInput(msg)) if msg.contains("regularization")
        ));

        let nan_tol = Settings {
            step_tol: f64::NAN,
            ..Settings::default()
        };
        assert!(nan_tol.validate().is_err());

        let negative_feasibility = Settings {
            feasibility_tol: -1e-9,
            ..Settings::default()
        };
        assert!(negative_feasibility.validate().is_err());

        let negative_time = Settings {
            time_limit: Some(-1.0),
            ..Settings::default()
        };
        assert!(negative_time.validate().is_err());
    }
}
