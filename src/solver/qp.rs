//! Dense primal active-set solver for convex quadratic programs.
//!
//! Solves
//!
//! ```text
//! minimize    (1/2) x' H x + c' x
//! subject to  a_i' x  = b_i   (equality rows)
//!             a_i' x >= b_i   (inequality rows)
//! ```
//!
//! from a feasible starting point. `H` must be positive definite on the null space
//! of every working set, which holds whenever `H` itself is positive definite.
//! Each iteration solves the equality-constrained subproblem on the working set
//! through its KKT system, then either steps to the nearest blocking constraint or
//! drops the constraint with the most negative multiplier.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{PortfolioError, Result};
use crate::objective::{ConstraintKind, LinearConstraint};

/// Steps shorter than this (infinity norm) count as zero.
const STEP_TOL: f64 = 1e-10;
/// Steps whose predicted decrease `-(g' p + p' H p / 2)` is below this count as
/// zero. Catches round-off steps along directions of near-zero curvature.
const DECREASE_TOL: f64 = 1e-20;
/// Multipliers above `-MULTIPLIER_TOL` count as non-negative.
const MULTIPLIER_TOL: f64 = 1e-10;
/// Directional slopes above `-SLOPE_TOL` do not block a step.
const SLOPE_TOL: f64 = 1e-14;

/// Termination status of the active-set method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpStatus {
    /// KKT conditions satisfied.
    Optimal,
    /// Iteration limit reached.
    MaxIterations,
}

/// Result of an active-set solve.
#[derive(Debug, Clone)]
pub struct QpSolution {
    /// Final point.
    pub x: DVector<f64>,
    /// Lagrange multipliers, one per constraint row (zero for inactive rows).
    pub multipliers: DVector<f64>,
    /// Termination status.
    pub status: QpStatus,
    /// Iterations performed.
    pub iterations: u32,
    /// Indices of the constraints in the final working set.
    pub working_set: Vec<usize>,
}

/// A convex QP bound to its data.
#[derive(Debug, Clone)]
pub struct ActiveSetQp<'a> {
    hessian: &'a DMatrix<f64>,
    linear: &'a DVector<f64>,
    constraints: &'a [LinearConstraint],
    max_iter: u32,
}

impl<'a> ActiveSetQp<'a> {
    /// Bind the QP data.
    pub fn new(
        hessian: &'a DMatrix<f64>,
        linear: &'a DVector<f64>,
        constraints: &'a [LinearConstraint],
    ) -> Self {
        ActiveSetQp {
            hessian,
            linear,
            constraints,
            max_iter: 500,
        }
    }

    /// Set the iteration limit.
    pub fn max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Objective value `(1/2) x' H x + c' x`.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(self.hessian * x)) + self.linear.dot(x)
    }

    /// True if `x` satisfies every constraint within `tol`.
    pub fn is_feasible(&self, x: &DVector<f64>, tol: f64) -> bool {
        self.constraints.iter().all(|c| c.violation(x) <= tol)
    }

    /// Run the active-set method from a feasible point `x0`.
    pub fn solve(&self, x0: DVector<f64>) -> Result<QpSolution> {
        let n = self.hessian.nrows();
        if x0.len() != n || self.linear.len() != n {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} variables", n),
                got: format!("start {}, linear term {}", x0.len(), self.linear.len()),
            });
        }

        let mut x = x0;
        let mut working: Vec<usize> = self
            .constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ConstraintKind::Equality)
            .map(|(i, _)| i)
            .collect();

        for iter in 0..self.max_iter {
            let g = self.hessian * &x + self.linear;
            let (p, lambda) = self.solve_kkt(&g, &working)?;

            let decrease = -(g.dot(&p) + 0.5 * p.dot(&(self.hessian * &p)));
            if p.amax() <= STEP_TOL || decrease <= DECREASE_TOL {
                let most_negative = working
                    .iter()
                    .enumerate()
                    .filter(|&(_, &i)| self.constraints[i].kind == ConstraintKind::Inequality)
                    .map(|(pos, _)| (pos, lambda[pos]))
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                match most_negative {
                    Some((pos, l)) if l < -MULTIPLIER_TOL => {
                        debug!(iter, constraint = working[pos], multiplier = l, "qp: release");
                        working.remove(pos);
                    }
                    _ => {
                        let mut multipliers = DVector::zeros(self.constraints.len());
                        for (pos, &i) in working.iter().enumerate() {
                            multipliers[i] = lambda[pos];
                        }
                        return Ok(QpSolution {
                            x,
                            multipliers,
                            status: QpStatus::Optimal,
                            iterations: iter + 1,
                            working_set: working,
                        });
                    }
                }
            } else {
                let mut alpha = 1.0;
                let mut blocking = None;

                for (i, c) in self.constraints.iter().enumerate() {
                    if c.kind == ConstraintKind::Equality || working.contains(&i) {
                        continue;
                    }
                    let slope = c.coefficients.dot(&p);
                    if slope < -SLOPE_TOL {
                        let ratio = (-c.residual(&x) / slope).max(0.0);
                        if ratio < alpha {
                            alpha = ratio;
                            blocking = Some(i);
                        }
                    }
                }

                x.axpy(alpha, &p, 1.0);
                if let Some(i) = blocking {
                    debug!(iter, constraint = i, alpha, "qp: block");
                    working.push(i);
                }
            }
        }

        Ok(QpSolution {
            x,
            multipliers: DVector::zeros(self.constraints.len()),
            status: QpStatus::MaxIterations,
            iterations: self.max_iter,
            working_set: working,
        })
    }

    /// Solve the working-set subproblem
    ///
    /// ```text
    /// [ H   -A' ] [ p      ]   [ -g ]
    /// [ A    0  ] [ lambda ] = [  0 ]
    /// ```
    fn solve_kkt(
        &self,
        g: &DVector<f64>,
        working: &[usize],
    ) -> Result<(DVector<f64>, DVector<f64>)> {
        let n = g.len();
        let m = working.len();

        let mut kkt = DMatrix::zeros(n + m, n + m);
        kkt.view_mut((0, 0), (n, n)).copy_from(self.hessian);
        for (row, &i) in working.iter().enumerate() {
            let a = &self.constraints[i].coefficients;
            for j in 0..n {
                kkt[(n + row, j)] = a[j];
                kkt[(j, n + row)] = -a[j];
            }
        }

        let mut rhs = DVector::zeros(n + m);
        rhs.rows_mut(0, n).copy_from(&(-g));

        let sol = kkt
            .lu()
            .solve(&rhs)
            .filter(|s| s.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                PortfolioError::NumericalError(format!(
                    "singular KKT system with {} active constraints",
                    m
                ))
            })?;

        Ok((sol.rows(0, n).into_owned(), sol.rows(n, m).into_owned()))
    }
}
