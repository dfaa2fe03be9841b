//! Portfolio objective and constraints.
//!
//! All functions here are pure in their inputs and can be evaluated without a
//! solver:
//! - `risk(w) = w' Σ w` is the minimization objective
//! - `budget(w) = sum(w) - 1` must equal zero
//! - `return_floor(w) = μ' w - target` must be non-negative
//! - each weight lies in `[lower, upper]` (long-only, `[0, 1]` by default)

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Portfolio variance `w' Σ w`.
pub fn risk(w: &DVector<f64>, cov: &DMatrix<f64>) -> f64 {
    w.dot(&(cov * w))
}

/// Gradient of `risk`: `2 Σ w`.
pub fn risk_gradient(w: &DVector<f64>, cov: &DMatrix<f64>) -> DVector<f64> {
    (cov * w) * 2.0
}

/// Hessian of `risk`: the constant matrix `2 Σ`.
pub fn risk_hessian(cov: &DMatrix<f64>) -> DMatrix<f64> {
    cov * 2.0
}

/// Budget constraint residual `sum(w) - 1`.
pub fn budget(w: &DVector<f64>) -> f64 {
    w.sum() - 1.0
}

/// Expected portfolio return `μ' w`.
pub fn expected_return(w: &DVector<f64>, expected_returns: &DVector<f64>) -> f64 {
    expected_returns.dot(w)
}

/// Minimum-return constraint residual `μ' w - target`.
pub fn return_floor(w: &DVector<f64>, expected_returns: &DVector<f64>, target: f64) -> f64 {
    expected_return(w, expected_returns) - target
}

/// Uniform per-asset weight bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Minimum weight of any asset.
    pub lower: f64,
    /// Maximum weight of any asset.
    pub upper: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        WeightBounds::long_only()
    }
}

impl WeightBounds {
    /// No short-selling and no more than 100% in any asset.
    pub fn long_only() -> Self {
        WeightBounds {
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Long-only with a cap on each single position.
    pub fn capped(upper: f64) -> Self {
        WeightBounds { lower: 0.0, upper }
    }

    /// Check `0 <= lower <= upper <= 1`.
    pub fn validate(&self) -> Result<()> {
        let ok = self.lower.is_finite()
            && self.upper.is_finite()
            && 0.0 <= self.lower
            && self.lower <= self.upper
            && self.upper <= 1.0;
        if ok {
            Ok(())
        } else {
            Err(PortfolioError::InvalidInput(format!(
                "weight bounds must satisfy 0 <= lower <= upper <= 1, got [{}, {}]",
                self.lower, self.upper
            )))
        }
    }

    /// Total amount by which `w` leaves the box.
    pub fn violation(&self, w: &DVector<f64>) -> f64 {
        w.iter()
            .map(|&wi| (self.lower - wi).max(0.0) + (wi - self.upper).max(0.0))
            .sum()
    }

    /// True if `sum(w) = 1` is reachable inside the box for `n` assets.
    pub fn admits_budget(&self, n: usize, tol: f64) -> bool {
        let n = n as f64;
        n * self.lower <= 1.0 + tol && n * self.upper >= 1.0 - tol
    }
}

/// Kind of a linear constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `a' x = b`.
    Equality,
    /// `a' x >= b`.
    Inequality,
}

/// A linear constraint `a' x = b` or `a' x >= b`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    /// Row vector `a`.
    pub coefficients: DVector<f64>,
    /// Right-hand side `b`.
    pub rhs: f64,
    /// Equality or inequality.
    pub kind: ConstraintKind,
}

impl LinearConstraint {
    /// Residual `a' x - b`.
    pub fn residual(&self, x: &DVector<f64>) -> f64 {
        self.coefficients.dot(x) - self.rhs
    }

    /// Amount by which `x` violates this row.
    pub fn violation(&self, x: &DVector<f64>) -> f64 {
        let r = self.residual(x);
        match self.kind {
            ConstraintKind::Equality => r.abs(),
            ConstraintKind::Inequality => (-r).max(0.0),
        }
    }
}

/// A constraint violated by a candidate allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Human-readable name of the constraint.
    pub constraint: String,
    /// Amount of violation.
    pub amount: f64,
}

/// The feasible region: budget, optional return floor, and weight bounds.
#[derive(Debug, Clone)]
pub struct PortfolioConstraints {
    expected_returns: DVector<f64>,
    target: Option<f64>,
    bounds: WeightBounds,
}

impl PortfolioConstraints {
    /// Create the constraint set. `target = None` drops the return floor.
    pub fn new(expected_returns: DVector<f64>, target: Option<f64>, bounds: WeightBounds) -> Self {
        PortfolioConstraints {
            expected_returns,
            target,
            bounds,
        }
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.expected_returns.len()
    }

    /// Minimum required return, if any.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Weight bounds.
    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    /// Expected return vector.
    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    /// All constraints as linear rows, in order: budget, return floor, lower
    /// bounds, upper bounds.
    pub fn linear_constraints(&self) -> Vec<LinearConstraint> {
        let n = self.num_assets();
        let mut rows = Vec::with_capacity(2 * n + 2);

        rows.push(LinearConstraint {
            coefficients: DVector::from_element(n, 1.0),
            rhs: 1.0,
            kind: ConstraintKind::Equality,
        });

        if let Some(target) = self.target {
            rows.push(LinearConstraint {
                coefficients: self.expected_returns.clone(),
                rhs: target,
                kind: ConstraintKind::Inequality,
            });
        }

        for i in 0..n {
            let mut a = DVector::zeros(n);
            a[i] = 1.0;
            rows.push(LinearConstraint {
                coefficients: a,
                rhs: self.bounds.lower,
                kind: ConstraintKind::Inequality,
            });
        }
        for i in 0..n {
            let mut a = DVector::zeros(n);
            a[i] = -1.0;
            rows.push(LinearConstraint {
                coefficients: a,
                rhs: -self.bounds.upper,
                kind: ConstraintKind::Inequality,
            });
        }

        rows
    }

    /// Total L1 violation of all constraints at `w`.
    pub fn violation(&self, w: &DVector<f64>) -> f64 {
        let floor = self
            .target
            .map(|t| (-return_floor(w, &self.expected_returns, t)).max(0.0))
            .unwrap_or(0.0);
        budget(w).abs() + floor + self.bounds.violation(w)
    }

    /// Constraints violated at `w` by more than `tol`.
    pub fn violations(&self, w: &DVector<f64>, tol: f64) -> Vec<Violation> {
        let mut out = Vec::new();

        for (i, &wi) in w.iter().enumerate() {
            if wi < self.bounds.lower - tol {
                out.push(Violation {
                    constraint: format!("lower bound on weight {}", i),
                    amount: self.bounds.lower - wi,
                });
            }
            if wi > self.bounds.upper + tol {
                out.push(Violation {
                    constraint: format!("upper bound on weight {}", i),
                    amount: wi - self.bounds.upper,
                });
            }
        }

        let b = budget(w).abs();
        if b > tol {
            out.push(Violation {
                constraint: "budget (weights must sum to 1)".into(),
                amount: b,
            });
        }

        if let Some(target) = self.target {
            let shortfall = -return_floor(w, &self.expected_returns, target);
            if shortfall > tol {
                out.push(Violation {
                    constraint: format!("minimum return {}", target),
                    amount: shortfall,
                });
            }
        }

        out
    }

    /// The feasible allocation with the highest expected return.
    ///
    /// Starts every weight at the lower bound and spends the remaining budget on
    /// assets in decreasing order of expected return. Returns `None` when the
    /// bounds cannot sum to one.
    pub fn max_return_allocation(&self) -> Option<DVector<f64>> {
        let n = self.num_assets();
        if n == 0 || !self.bounds.admits_budget(n, 0.0) {
            return None;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| self.expected_returns[b].total_cmp(&self.expected_returns[a]));

        let mut w = DVector::from_element(n, self.bounds.lower);
        let mut remaining = 1.0 - n as f64 * self.bounds.lower;
        let room = self.bounds.upper - self.bounds.lower;
        for i in order {
            if remaining <= 0.0 {
                break;
            }
            let add = room.min(remaining);
            w[i] += add;
            remaining -= add;
        }

        Some(w)
    }

    /// Explain why the feasible region is empty, or `None` if it is not.
    pub fn check_feasible(&self, tol: f64) -> Option<String> {
        let n = self.num_assets();
        let Some(best) = self.max_return_allocation() else {
            return Some(format!(
                "budget constraint cannot be met: {} weights bounded by [{}, {}] cannot sum to 1",
                n, self.bounds.lower, self.bounds.upper
            ));
        };

        let target = self.target?;
        let max_return = expected_return(&best, &self.expected_returns);
        if max_return < target - tol {
            return Some(format!(
                "minimum return constraint cannot be met: target {} exceeds the maximum \
                 achievable return {:.6} under the budget and weight bounds",
                target, max_return
            ));
        }

        None
    }
}
