//! Per-period simple returns.

use chrono::NaiveDate;
use nalgebra::DMatrix;

use super::prices::PriceSeries;
use crate::error::{PortfolioError, Result};

/// Simple returns `r[t] = p[t] / p[t-1] - 1`, one row per period.
///
/// Has one row fewer than the price series it came from. `dates()[k]` is the
/// closing date of period `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    returns: DMatrix<f64>,
}

impl ReturnSeries {
    /// Compute returns from aligned prices. Needs at least two observations.
    pub fn from_prices(prices: &PriceSeries) -> Result<Self> {
        let t = prices.len();
        if t < 2 {
            return Err(PortfolioError::InsufficientData {
                observations: t,
                required: 2,
            });
        }

        let p = prices.prices();
        let returns = DMatrix::from_fn(t - 1, prices.num_assets(), |row, col| {
            p[(row + 1, col)] / p[(row, col)] - 1.0
        });

        Ok(ReturnSeries {
            assets: prices.assets().to_vec(),
            dates: prices.dates()[1..].to_vec(),
            returns,
        })
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Period end dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The `(T-1) x N` return matrix.
    pub fn returns(&self) -> &DMatrix<f64> {
        &self.returns
    }

    /// Number of return periods.
    pub fn len(&self) -> usize {
        self.returns.nrows()
    }

    /// True if there are no return periods.
    pub fn is_empty(&self) -> bool {
        self.returns.nrows() == 0
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.returns.ncols()
    }
}
