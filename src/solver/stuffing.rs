//! Matrix stuffing: converts the allocation problem to conic form.
//!
//! This module builds the matrices (P, q, A, b) and cone specifications
//! required by Clarabel:
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x + s = b,  s in K
//! ```

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::objective::{ConstraintKind, LinearConstraint, PortfolioConstraints};
use crate::sparse::{csc_from_triplets, dense_to_csc_upper, dense_rows_to_csc};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (n x n, upper triangle).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
}

/// Build the stuffed problem for `minimize w' Σ w` over the feasible region.
pub fn stuff_problem(covariance: &DMatrix<f64>, constraints: &PortfolioConstraints) -> StuffedProblem {
    let n = constraints.num_assets();

    // Clarabel uses objective (1/2) x' P x, so P = 2Σ gives x' Σ x.
    let p = dense_to_csc_upper(&(covariance * 2.0));
    let q = vec![0.0; n];

    let (a, b, cone_dims) = stuff_constraints(&constraints.linear_constraints(), n);

    StuffedProblem {
        p,
        q,
        a,
        b,
        cone_dims,
    }
}

/// Stuff linear rows into A, b and cone dims, equality rows first.
///
/// `a' x = b` becomes a zero-cone row `a' x + s = b`. `a' x >= b` becomes the
/// nonnegative-cone row `-a' x + s = -b`.
fn stuff_constraints(rows: &[LinearConstraint], n: usize) -> (CscMatrix<f64>, Vec<f64>, ConeDims) {
    let zeros: Vec<&LinearConstraint> = rows
        .iter()
        .filter(|r| r.kind == ConstraintKind::Equality)
        .collect();
    let nonnegs: Vec<&LinearConstraint> = rows
        .iter()
        .filter(|r| r.kind == ConstraintKind::Inequality)
        .collect();

    let cone_dims = ConeDims {
        zero: zeros.len(),
        nonneg: nonnegs.len(),
    };

    let mut dense_rows = Vec::with_capacity(cone_dims.total());
    let mut b = Vec::with_capacity(cone_dims.total());

    for row in zeros {
        dense_rows.push(row.coefficients.iter().copied().collect::<Vec<f64>>());
        b.push(row.rhs);
    }
    for row in nonnegs {
        dense_rows.push(row.coefficients.iter().map(|v| -v).collect::<Vec<f64>>());
        b.push(-row.rhs);
    }

    let a = if dense_rows.is_empty() {
        csc_from_triplets(0, n, &[])
    } else {
        dense_rows_to_csc(&dense_rows, n)
    };

    (a, b, cone_dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::WeightBounds;
    use nalgebra::DVector;

    #[test]
    fn test_stuff_two_assets() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        let c = PortfolioConstraints::new(
            DVector::from_vec(vec![0.1, 0.2]),
            Some(0.15),
            WeightBounds::long_only(),
        );
        let stuffed = stuff_problem(&cov, &c);

        assert_eq!(stuffed.cone_dims, ConeDims { zero: 1, nonneg: 5 });
        assert_eq!(stuffed.a.nrows(), 6);
        assert_eq!(stuffed.a.ncols(), 2);
        assert_eq!(stuffed.b, vec![1.0, -0.15, 0.0, 0.0, 1.0, 1.0]);

        // Upper triangle only: (0,0), (0,1), (1,1)
        assert_eq!(stuffed.p.nnz(), 3);
        assert!(stuffed.p.triplet_iter().all(|(r, c, _)| r <= c));
    }
}
