//! Run configuration.
//!
//! `Config` derives serde traits with field defaults, so a host application can
//! load a partial configuration from any serde format.

use serde::{Deserialize, Serialize};

use crate::model::TRADING_DAYS_PER_YEAR;
use crate::objective::WeightBounds;
use crate::solver::Settings;

/// Settings for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Periods per year used to annualize returns (252 for daily prices).
    pub periods_per_year: f64,
    /// Per-asset weight bounds.
    pub bounds: WeightBounds,
    /// Solver settings.
    pub solver: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            bounds: WeightBounds::long_only(),
            solver: Settings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Method;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.periods_per_year, 252.0);
        assert_eq!(config.bounds, WeightBounds::long_only());
        assert_eq!(config.solver.method, Method::Sqp);
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"solver": {"method": "interior_point", "max_iter": 50}}"#)
                .unwrap();
        assert_eq!(config.solver.method, Method::InteriorPoint);
        assert_eq!(config.solver.max_iter, 50);
        assert_eq!(config.solver.validation_tol, 1e-6);
        assert_eq!(config.periods_per_year, 252.0);
    }

    #[test]
    fn test_round_trip() {
        let config = Config {
            bounds: WeightBounds::capped(0.4),
            ..Config::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
