//! Clarabel solver integration.
//!
//! This module provides the interior-point backend. The allocation problem is
//! stuffed into conic form and handed to the Clarabel solver.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use super::stuffing::{stuff_problem, ConeDims};
use super::{Method, RawSolution, Settings, SolveStatus};
use crate::objective::{risk, PortfolioConstraints};

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solve the allocation problem with Clarabel.
///
/// `initial` is reported as the last iterate when Clarabel returns no usable
/// primal point.
pub fn solve(
    covariance: &DMatrix<f64>,
    constraints: &PortfolioConstraints,
    initial: DVector<f64>,
    settings: &Settings,
) -> RawSolution {
    let stuffed = stuff_problem(covariance, constraints);

    let p = to_clarabel_csc(&stuffed.p);
    let a = to_clarabel_csc(&stuffed.a);
    let cones = to_clarabel_cones(&stuffed.cone_dims);

    let clarabel_settings = match DefaultSettingsBuilder::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit.unwrap_or(f64::INFINITY))
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .build()
    {
        Ok(s) => s,
        Err(e) => {
            return RawSolution {
                method: Method::InteriorPoint,
                status: SolveStatus::NumericalError,
                objective: risk(&initial, covariance),
                weights: initial,
                iterations: 0,
                message: format!("invalid Clarabel settings: {}", e),
            }
        }
    };

    let mut solver = DefaultSolver::new(&p, &stuffed.q, &a, &stuffed.b, &cones, clarabel_settings);
    solver.solve();

    let clarabel_status = solver.solution.status;
    let status: SolveStatus = clarabel_status.into();
    let iterations = solver.info.iterations;
    debug!(
        ?clarabel_status,
        iterations,
        solve_time = solver.solution.solve_time,
        "clarabel: finished"
    );

    let x = &solver.solution.x;
    let weights = if x.len() == initial.len() && x.iter().all(|v| v.is_finite()) {
        DVector::from_column_slice(x)
    } else {
        initial
    };

    let message = match status {
        SolveStatus::Optimal => "Solved".to_string(),
        SolveStatus::Infeasible => constraints
            .check_feasible(settings.feasibility_tol)
            .unwrap_or_else(|| format!("Problem is infeasible ({:?})", clarabel_status)),
        _ => format!("Clarabel stopped with status {:?}", clarabel_status),
    };
    if status != SolveStatus::Optimal {
        warn!(%message, "clarabel: not solved");
    }

    RawSolution {
        method: Method::InteriorPoint,
        status,
        objective: risk(&weights, covariance),
        weights,
        iterations,
        message,
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    cones
}
