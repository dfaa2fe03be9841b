//! Sequential quadratic programming driver.
//!
//! Each iteration builds the quadratic model of the Lagrangian at the current
//! weights (exact Hessian `2Σ`, exact linear constraints), solves it with the
//! active-set method, and sizes the step by backtracking on the L1 merit function
//! `risk(w) + ρ · violation(w)`.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use super::qp::{ActiveSetQp, QpStatus};
use super::{Method, RawSolution, Settings, SolveStatus};
use crate::objective::{risk, risk_gradient, risk_hessian, PortfolioConstraints};

/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;
/// Maximum step halvings per line search.
const MAX_BACKTRACKS: u32 = 40;
/// Predicted decrease, relative to the merit value, treated as round-off.
const STALL_TOL: f64 = 1e-10;

/// Minimize `w' Σ w` over the feasible region, starting from `initial`.
pub fn solve(
    covariance: &DMatrix<f64>,
    constraints: &PortfolioConstraints,
    initial: DVector<f64>,
    settings: &Settings,
) -> RawSolution {
    let n = constraints.num_assets();
    let rows = constraints.linear_constraints();

    let mut hessian = risk_hessian(covariance);
    for i in 0..n {
        hessian[(i, i)] += settings.regularization;
    }
    debug!(regularization = settings.regularization, "sqp: hessian ready");

    let finish = |status, weights: DVector<f64>, iterations, message: String| RawSolution {
        method: Method::Sqp,
        status,
        objective: risk(&weights, covariance),
        weights,
        iterations,
        message,
    };

    // The QP subproblem shares the constraints of the full problem, so an empty
    // feasible region shows up before the first iteration.
    let vertex = match constraints.max_return_allocation() {
        Some(v) => v,
        None => {
            let message = constraints
                .check_feasible(settings.feasibility_tol)
                .unwrap_or_else(|| "budget constraint cannot be met".into());
            warn!(%message, "sqp: infeasible");
            return finish(SolveStatus::Infeasible, initial, 0, message);
        }
    };
    if let Some(message) = constraints.check_feasible(settings.feasibility_tol) {
        warn!(%message, "sqp: infeasible");
        return finish(SolveStatus::Infeasible, initial, 0, message);
    }

    let mut w = initial;
    let mut penalty: f64 = 1.0;

    for k in 0..settings.max_iter {
        let grad = risk_gradient(&w, covariance);
        let linear = &grad - &hessian * &w;
        let qp = ActiveSetQp::new(&hessian, &linear, &rows).max_iter(settings.max_qp_iter);

        let start = if qp.is_feasible(&w, settings.feasibility_tol) {
            w.clone()
        } else {
            vertex.clone()
        };

        let sub = match qp.solve(start) {
            Ok(sub) => sub,
            Err(e) => {
                warn!(error = %e, "sqp: subproblem failed");
                return finish(SolveStatus::NumericalError, w, k + 1, e.to_string());
            }
        };
        if sub.status == QpStatus::MaxIterations {
            let message = format!(
                "QP subproblem did not converge within {} iterations",
                settings.max_qp_iter
            );
            warn!(%message, "sqp: subproblem limit");
            return finish(SolveStatus::MaxIterations, w, k + 1, message);
        }

        let d = &sub.x - &w;
        let violation = constraints.violation(&w);
        if d.amax() < settings.step_tol && violation < settings.feasibility_tol {
            debug!(iterations = k + 1, "sqp: converged");
            return finish(
                SolveStatus::Optimal,
                w,
                k + 1,
                "Optimization terminated successfully".into(),
            );
        }

        penalty = penalty.max(2.0 * sub.multipliers.amax() + 1e-4);
        let merit = |x: &DVector<f64>| risk(x, covariance) + penalty * constraints.violation(x);
        let phi0 = merit(&w);
        let slope = (grad.dot(&d) - penalty * violation).min(0.0);

        let mut alpha = 1.0;
        for _ in 0..MAX_BACKTRACKS {
            let trial = &w + &d * alpha;
            if merit(&trial) <= phi0 + ARMIJO * alpha * slope {
                break;
            }
            alpha *= 0.5;
        }

        let step = alpha * d.amax();
        w.axpy(alpha, &d, 1.0);
        debug!(
            iter = k,
            alpha,
            step,
            violation,
            risk = risk(&w, covariance),
            "sqp: step"
        );

        // Along flat directions of a singular Σ the QP direction never vanishes,
        // but the merit function cannot tell it from round-off either.
        let predicted = -(grad.dot(&d) + 0.5 * d.dot(&(&hessian * &d)));
        if step < settings.step_tol
            && predicted <= STALL_TOL * phi0.abs()
            && constraints.violation(&w) < settings.feasibility_tol
        {
            debug!(iterations = k + 1, predicted, "sqp: converged (stalled at round-off)");
            return finish(
                SolveStatus::Optimal,
                w,
                k + 1,
                "Optimization terminated successfully".into(),
            );
        }
    }

    let message = format!("Iteration limit reached ({} iterations)", settings.max_iter);
    warn!(%message, "sqp: not converged");
    finish(SolveStatus::MaxIterations, w, settings.max_iter, message)
}
