//! Return model construction.
//!
//! This module turns historical prices into the inputs of the optimizer:
//! - `PriceSeries` - Aligned adjusted-close prices, one column per asset
//! - `ReturnSeries` - Per-period simple returns
//! - `ReturnModel` - Annualized expected returns and covariance matrix

pub mod estimate;
pub mod prices;
pub mod returns;

pub use estimate::{ReturnModel, TRADING_DAYS_PER_YEAR};
pub use prices::{validate_assets, PriceSeries};
pub use returns::ReturnSeries;
