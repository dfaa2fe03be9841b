//! Problem definition and solving API.
//!
//! The `Problem` struct represents one minimum-variance allocation problem:
//! - A return model (expected returns and covariance)
//! - An optional minimum expected return
//! - Weight bounds and an initial guess
//!
//! Use the builder pattern to construct problems:
//! ```ignore
//! let allocation = Problem::min_variance(model)
//!     .target_return(0.15)
//!     .solve()?;
//! ```

use nalgebra::DVector;
use tracing::debug;

use crate::allocation::Allocation;
use crate::error::{PortfolioError, Result};
use crate::model::ReturnModel;
use crate::objective::{PortfolioConstraints, WeightBounds};
use crate::solver::{solve_interior_point, solve_sqp, Method, Settings};
use crate::validate::{validate, OptimizationResult};

/// A minimum-variance allocation problem.
#[derive(Debug, Clone)]
pub struct Problem {
    model: ReturnModel,
    constraints: PortfolioConstraints,
    initial_guess: Option<DVector<f64>>,
}

impl Problem {
    /// Create a minimum-variance problem over the assets of `model`.
    pub fn min_variance(model: ReturnModel) -> ProblemBuilder {
        ProblemBuilder {
            model,
            target: None,
            bounds: WeightBounds::default(),
            initial_guess: None,
        }
    }

    /// The return model.
    pub fn model(&self) -> &ReturnModel {
        &self.model
    }

    /// The feasible region.
    pub fn constraints(&self) -> &PortfolioConstraints {
        &self.constraints
    }

    /// Minimum expected return, if any.
    pub fn target_return(&self) -> Option<f64> {
        self.constraints.target()
    }

    /// Starting weights: the caller's guess, or equal weights.
    pub fn initial_guess(&self) -> DVector<f64> {
        let n = self.model.num_assets();
        self.initial_guess
            .clone()
            .unwrap_or_else(|| DVector::from_element(n, 1.0 / n as f64))
    }

    /// Check the problem data before solving.
    pub fn check(&self) -> Result<()> {
        if let Some(target) = self.target_return() {
            if !target.is_finite() {
                return Err(PortfolioError::InvalidInput(format!(
                    "target return must be finite, got {}",
                    target
                )));
            }
        }

        self.constraints.bounds().validate()?;

        if let Some(guess) = &self.initial_guess {
            let n = self.model.num_assets();
            if guess.len() != n {
                return Err(PortfolioError::ShapeMismatch {
                    expected: format!("{} initial weights", n),
                    got: format!("{}", guess.len()),
                });
            }
            if guess.iter().any(|v| !v.is_finite()) {
                return Err(PortfolioError::InvalidInput(
                    "initial guess must be finite".into(),
                ));
            }
        }

        Ok(())
    }

    /// Solve and validate, returning the typed outcome.
    ///
    /// Only invalid problem data or settings are reported as `Err`; solver failures are
    /// `OptimizationResult::Failure`.
    pub fn evaluate(&self, settings: &Settings) -> Result<OptimizationResult> {
        self.check()?;
        settings.validate()?;

        let covariance = self.model.covariance();
        let initial = self.initial_guess();
        debug!(
            method = ?settings.method,
            assets = self.model.num_assets(),
            target = ?self.target_return(),
            "solving allocation problem"
        );

        let raw = match settings.method {
            Method::Sqp => solve_sqp(covariance, &self.constraints, initial, settings),
            Method::InteriorPoint => {
                solve_interior_point(covariance, &self.constraints, initial, settings)
            }
        };

        Ok(validate(raw, self, settings.validation_tol))
    }

    /// Solve the problem with default settings.
    pub fn solve(&self) -> Result<Allocation> {
        self.solve_with(&Settings::default())
    }

    /// Solve the problem with custom settings.
    pub fn solve_with(&self, settings: &Settings) -> Result<Allocation> {
        self.evaluate(settings)?.into_result()
    }
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    model: ReturnModel,
    target: Option<f64>,
    bounds: WeightBounds,
    initial_guess: Option<DVector<f64>>,
}

impl ProblemBuilder {
    /// Require an expected return of at least `target`.
    pub fn target_return(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the per-asset weight bounds.
    pub fn bounds(mut self, bounds: WeightBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Start the solver from `weights` instead of equal weights.
    pub fn initial_guess(mut self, weights: impl Into<Vec<f64>>) -> Self {
        self.initial_guess = Some(DVector::from_vec(weights.into()));
        self
    }

    /// Build the problem.
    pub fn build(self) -> Problem {
        let constraints =
            PortfolioConstraints::new(self.model.expected_returns().clone(), self.target, self.bounds);
        Problem {
            model: self.model,
            constraints,
            initial_guess: self.initial_guess,
        }
    }

    /// Build and solve the problem with default settings.
    pub fn solve(self) -> Result<Allocation> {
        self.build().solve()
    }

    /// Build and solve the problem with custom settings.
    pub fn solve_with(self, settings: &Settings) -> Result<Allocation> {
        self.build().solve_with(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn model() -> ReturnModel {
        ReturnModel::new(
            vec!["A".into(), "B".into()],
            DVector::from_vec(vec![0.10, 0.20]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]),
        )
        .unwrap()
    }

    #[test]
    fn test_problem_builder() {
        let problem = Problem::min_variance(model()).target_return(0.15).build();
        assert_eq!(problem.target_return(), Some(0.15));
        assert_eq!(problem.initial_guess(), DVector::from_element(2, 0.5));
        assert!(problem.check().is_ok());
    }

    #[test]
    fn test_rejects_bad_guess() {
        let problem = Problem::min_variance(model()).initial_guess(vec![1.0]).build();
        assert!(matches!(
            problem.check(),
            Err(PortfolioError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_target_and_bounds() {
        let nan = Problem::min_variance(model()).target_return(f64::NAN).build();
        assert!(nan.solve().is_err());

        let bounds = Problem::min_variance(model())
            .bounds(WeightBounds { lower: 0.6, upper: 0.5 })
            .build();
        assert!(matches!(bounds.solve(), Err(PortfolioError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_bad_settings() {
        let settings = Settings {
            regularization: -0.5,
            ..Settings::default()
        };
        let result = Problem::min_variance(model())
            .target_return(0.15)
            .solve_with(&settings);
        assert!(matches!(result, Err(PortfolioError::InvalidInput(_))));
    }

    #[test]
    fn test_solve_simple() {
        let allocation = Problem::min_variance(model())
            .target_return(0.15)
            .solve()
            .expect("solve failed");
        assert!((allocation.weights[0] - 0.5).abs() < 1e-6);
        assert!((allocation.achieved_risk - 0.0375).abs() < 1e-8);
    }

    #[test]
    fn test_solve_interior_point() {
        let settings = Settings {
            method: Method::InteriorPoint,
            ..Settings::default()
        };
        let allocation = Problem::min_variance(model())
            .target_return(0.15)
            .solve_with(&settings)
            .expect("solve failed");
        assert_eq!(allocation.method, Method::InteriorPoint);
        assert!((allocation.weights[1] - 0.5).abs() < 1e-5);
    }
}
