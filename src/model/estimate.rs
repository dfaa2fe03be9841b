//! Annualized expected returns and covariance.
//!
//! Expected returns are the sample mean of periodic returns scaled by the number of
//! periods per year. The covariance is the unbiased (ddof = 1) sample covariance,
//! scaled the same way.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prices::{validate_assets, PriceSeries};
use super::returns::ReturnSeries;
use crate::error::{PortfolioError, Result};

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Relative tolerance for the symmetry check in `ReturnModel::new`.
const SYMMETRY_TOL: f64 = 1e-9;

/// Risk/return model consumed by the optimizer. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnModel {
    assets: Vec<String>,
    expected_returns: DVector<f64>,
    covariance: DMatrix<f64>,
    periods_per_year: f64,
}

impl ReturnModel {
    /// Create a model from known annualized moments.
    ///
    /// The covariance must be square, finite, symmetric up to a small relative
    /// tolerance, and have a non-negative diagonal. Its exact symmetric part is
    /// stored.
    pub fn new(
        assets: Vec<String>,
        expected_returns: DVector<f64>,
        covariance: DMatrix<f64>,
    ) -> Result<Self> {
        validate_assets(&assets)?;
        let n = assets.len();

        if expected_returns.len() != n {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} expected returns", n),
                got: format!("{}", expected_returns.len()),
            });
        }
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} x {} covariance", n, n),
                got: format!("{} x {}", covariance.nrows(), covariance.ncols()),
            });
        }
        if expected_returns.iter().any(|v| !v.is_finite())
            || covariance.iter().any(|v| !v.is_finite())
        {
            return Err(PortfolioError::InvalidInput(
                "expected returns and covariance must be finite".into(),
            ));
        }

        let scale = covariance.amax().max(1.0);
        for i in 0..n {
            if covariance[(i, i)] < 0.0 {
                return Err(PortfolioError::InvalidInput(format!(
                    "variance of {} is negative",
                    assets[i]
                )));
            }
            for j in (i + 1)..n {
                if (covariance[(i, j)] - covariance[(j, i)]).abs() > SYMMETRY_TOL * scale {
                    return Err(PortfolioError::InvalidInput(format!(
                        "covariance is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        let covariance = (&covariance + covariance.transpose()) * 0.5;

        Ok(ReturnModel {
            assets,
            expected_returns,
            covariance,
            periods_per_year: 1.0,
        })
    }

    /// Estimate the model from aligned prices.
    pub fn from_prices(prices: &PriceSeries, periods_per_year: f64) -> Result<Self> {
        let returns = ReturnSeries::from_prices(prices)?;
        Self::from_returns(&returns, periods_per_year)
    }

    /// Estimate the model from periodic returns.
    ///
    /// Needs at least two return periods for the ddof = 1 covariance.
    pub fn from_returns(returns: &ReturnSeries, periods_per_year: f64) -> Result<Self> {
        if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
            return Err(PortfolioError::InvalidInput(format!(
                "periods per year must be positive, got {}",
                periods_per_year
            )));
        }

        let t = returns.len();
        if t < 2 {
            // One period leaves no degrees of freedom for the sample covariance.
            return Err(PortfolioError::InsufficientData {
                observations: t + 1,
                required: 3,
            });
        }

        let r = returns.returns();
        let n = returns.num_assets();
        let means = DVector::from_fn(n, |i, _| r.column(i).mean());

        let mut centered = r.clone();
        for (i, mut col) in centered.column_iter_mut().enumerate() {
            col.add_scalar_mut(-means[i]);
        }
        let covariance = (centered.transpose() * &centered) * (periods_per_year / (t - 1) as f64);
        // Guard against round-off asymmetry from the product.
        let covariance = (&covariance + covariance.transpose()) * 0.5;

        debug!(assets = n, periods = t, "estimated return model");

        Ok(ReturnModel {
            assets: returns.assets().to_vec(),
            expected_returns: means * periods_per_year,
            covariance,
            periods_per_year,
        })
    }

    /// Asset identifiers in model order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Annualized expected return per asset.
    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    /// Annualized covariance matrix.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Annualization factor used to build the model (1 for `ReturnModel::new`).
    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Highest single-asset expected return.
    pub fn max_expected_return(&self) -> f64 {
        self.expected_returns.max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn prices(rows: &[f64], n: usize) -> PriceSeries {
        let t = rows.len() / n;
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        PriceSeries::new(
            (0..n).map(|i| format!("A{}", i)).collect(),
            (0..t).map(|d| start + chrono::Days::new(d as u64)).collect(),
            DMatrix::from_row_slice(t, n, rows),
        )
        .unwrap()
    }

    #[test]
    fn test_annualized_moments() {
        // Returns: A0 = [0.1, -0.1, 0.1], A1 = [0.0, 0.2, -0.1]
        let p = prices(
            &[
                100.0, 100.0, //
                110.0, 100.0, //
                99.0, 120.0, //
                108.9, 108.0,
            ],
            2,
        );
        let model = ReturnModel::from_prices(&p, TRADING_DAYS_PER_YEAR).unwrap();

        let r0 = [0.1, -0.1, 0.1];
        let r1 = [0.0, 0.2, -0.1];
        let m0 = r0.iter().sum::<f64>() / 3.0;
        let m1 = r1.iter().sum::<f64>() / 3.0;
        let cov = |a: &[f64], ma: f64, b: &[f64], mb: f64| {
            a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / 2.0 * 252.0
        };

        assert_relative_eq!(model.expected_returns()[0], m0 * 252.0, epsilon = 1e-9);
        assert_relative_eq!(model.expected_returns()[1], m1 * 252.0, epsilon = 1e-9);
        assert_relative_eq!(model.covariance()[(0, 0)], cov(&r0, m0, &r0, m0), epsilon = 1e-9);
        assert_relative_eq!(model.covariance()[(1, 1)], cov(&r1, m1, &r1, m1), epsilon = 1e-9);
        assert_relative_eq!(model.covariance()[(0, 1)], cov(&r0, m0, &r1, m1), epsilon = 1e-9);
        assert_eq!(model.covariance()[(0, 1)], model.covariance()[(1, 0)]);
    }

    #[test]
    fn test_two_prices_is_insufficient() {
        let p = prices(&[100.0, 101.0], 1);
        let err = ReturnModel::from_prices(&p, TRADING_DAYS_PER_YEAR).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData { .. }));
    }

    #[test]
    fn test_new_validates_covariance() {
        let assets = vec!["A".to_string(), "B".to_string()];
        let mu = DVector::from_vec(vec![0.1, 0.2]);

        let asym = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.02, 0.09]);
        assert!(ReturnModel::new(assets.clone(), mu.clone(), asym).is_err());

        let neg = DMatrix::from_row_slice(2, 2, &[-0.04, 0.0, 0.0, 0.09]);
        assert!(ReturnModel::new(assets.clone(), mu.clone(), neg).is_err());

        let wrong = DMatrix::from_element(3, 3, 0.01);
        assert!(matches!(
            ReturnModel::new(assets.clone(), mu.clone(), wrong),
            Err(PortfolioError::ShapeMismatch { .. })
        ));

        let ok = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        let model = ReturnModel::new(assets, mu, ok).unwrap();
        assert_eq!(model.max_expected_return(), 0.2);
    }
}
