//! Sparse matrix utilities.
//!
//! Builders for the nalgebra-sparse CSC matrices handed to the conic backend.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Entries with magnitude at or below this are not stored.
const DROP_TOL: f64 = 1e-15;

/// Assemble a CSC matrix from `(row, col, value)` triplets.
///
/// Duplicate positions are summed. Out-of-range triplets are skipped.
pub fn csc_from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(nrows, ncols);
    for &(row, col, val) in triplets.iter().filter(|&&(r, c, _)| r < nrows && c < ncols) {
        coo.push(row, col, val);
    }
    CscMatrix::from(&coo)
}

/// Convert the entries of a dense matrix accepted by `keep(row, col)` to CSC.
fn dense_to_csc_filtered(dense: &DMatrix<f64>, keep: impl Fn(usize, usize) -> bool) -> CscMatrix<f64> {
    let triplets: Vec<(usize, usize, f64)> = (0..dense.ncols())
        .flat_map(|j| (0..dense.nrows()).map(move |i| (i, j)))
        .filter(|&(i, j)| keep(i, j))
        .map(|(i, j)| (i, j, dense[(i, j)]))
        .filter(|&(_, _, v)| v.abs() > DROP_TOL)
        .collect();

    csc_from_triplets(dense.nrows(), dense.ncols(), &triplets)
}

/// Convert a dense matrix to CSC format.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    dense_to_csc_filtered(dense, |_, _| true)
}

/// Upper triangle (including the diagonal) of a dense matrix, in CSC format.
pub fn dense_to_csc_upper(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    dense_to_csc_filtered(dense, |i, j| i <= j)
}

/// Stack dense rows of length `ncols` into a CSC matrix.
pub fn dense_rows_to_csc(rows: &[Vec<f64>], ncols: usize) -> CscMatrix<f64> {
    let dense = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i].get(j).copied().unwrap_or(0.0));
    dense_to_csc(&dense)
}
