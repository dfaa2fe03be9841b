//! Aligned price tables.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{PortfolioError, Result};

/// Check a list of asset identifiers: non-empty, no blank names, no duplicates.
pub fn validate_assets(assets: &[String]) -> Result<()> {
    if assets.is_empty() {
        return Err(PortfolioError::InvalidInput(
            "at least one asset is required".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in assets {
        if asset.trim().is_empty() {
            return Err(PortfolioError::InvalidInput(
                "asset identifiers must not be blank".into(),
            ));
        }
        if !seen.insert(asset.as_str()) {
            return Err(PortfolioError::InvalidInput(format!(
                "duplicate asset identifier '{}'",
                asset
            )));
        }
    }

    Ok(())
}

/// Adjusted-close prices on a common date index.
///
/// Rows are dates in strictly increasing order, columns are assets. Every entry
/// is finite and strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    prices: DMatrix<f64>,
}

impl PriceSeries {
    /// Create a price series from an already aligned `T x N` matrix.
    pub fn new(assets: Vec<String>, dates: Vec<NaiveDate>, prices: DMatrix<f64>) -> Result<Self> {
        validate_assets(&assets)?;

        if prices.nrows() != dates.len() || prices.ncols() != assets.len() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} x {}", dates.len(), assets.len()),
                got: format!("{} x {}", prices.nrows(), prices.ncols()),
            });
        }

        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(PortfolioError::InvalidInput(format!(
                "dates must be strictly increasing, found {} before {}",
                pair[0], pair[1]
            )));
        }

        for (row, date) in dates.iter().enumerate() {
            for (col, asset) in assets.iter().enumerate() {
                let p = prices[(row, col)];
                if !p.is_finite() || p <= 0.0 {
                    return Err(PortfolioError::InvalidInput(format!(
                        "price for {} on {} must be finite and positive, got {}",
                        asset, date, p
                    )));
                }
            }
        }

        Ok(PriceSeries {
            assets,
            dates,
            prices,
        })
    }

    /// Align per-asset `(date, price)` observations on their common dates.
    ///
    /// Only dates observed for every asset are kept. Non-finite prices count as
    /// missing observations.
    pub fn align<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<(NaiveDate, f64)>)>,
        S: Into<String>,
    {
        let mut assets = Vec::new();
        // Outer `Option`: observed at all. Inner `Option`: observed and finite.
        let mut rows: BTreeMap<NaiveDate, Vec<Option<Option<f64>>>> = BTreeMap::new();
        let columns: Vec<(String, Vec<(NaiveDate, f64)>)> = columns
            .into_iter()
            .map(|(asset, obs)| (asset.into(), obs))
            .collect();
        let n = columns.len();

        for (col, (asset, observations)) in columns.into_iter().enumerate() {
            for (date, price) in observations {
                let row = rows.entry(date).or_insert_with(|| vec![None; n]);
                if row[col].is_some() {
                    return Err(PortfolioError::InvalidInput(format!(
                        "duplicate observation for {} on {}",
                        asset, date
                    )));
                }
                row[col] = Some(price.is_finite().then_some(price));
            }
            assets.push(asset);
        }

        validate_assets(&assets)?;

        let total = rows.len();
        let complete: Vec<(NaiveDate, Vec<f64>)> = rows
            .into_iter()
            .filter_map(|(date, row)| {
                row.into_iter()
                    .map(Option::flatten)
                    .collect::<Option<Vec<f64>>>()
                    .map(|r| (date, r))
            })
            .collect();

        if complete.len() < total {
            debug!(
                dropped = total - complete.len(),
                kept = complete.len(),
                "dropped dates with missing prices"
            );
        }

        let dates: Vec<NaiveDate> = complete.iter().map(|(d, _)| *d).collect();
        let prices = DMatrix::from_fn(complete.len(), n, |r, c| complete[r].1[c]);

        PriceSeries::new(assets, dates, prices)
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Row dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The `T x N` price matrix.
    pub fn prices(&self) -> &DMatrix<f64> {
        &self.prices
    }

    /// Number of aligned observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True if no date survived alignment.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }
}
