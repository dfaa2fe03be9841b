//! Error types for minvar.

use thiserror::Error;

/// Error type for portfolio construction and optimization.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Too few aligned observations to estimate the return model.
    #[error("Insufficient data: need at least {required} observations, got {observations}")]
    InsufficientData {
        observations: usize,
        required: usize,
    },

    /// The constraints admit no allocation.
    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraint(String),

    /// The solver stopped before meeting its tolerances.
    #[error("Solver did not converge: {message}")]
    NonConvergence {
        message: String,
        /// Last weights the solver produced, for debugging only.
        last_iterate: Vec<f64>,
    },

    /// Invalid input at the core boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// Result type for minvar operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
