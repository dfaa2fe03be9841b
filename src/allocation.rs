//! Validated allocations.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::solver::Method;

/// Portfolio weights accepted by the validator.
///
/// Every component lies within the weight bounds and the components sum to one,
/// both up to the validation tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector(DVector<f64>);

impl WeightVector {
    pub(crate) fn new(weights: DVector<f64>) -> Self {
        WeightVector(weights)
    }

    /// Number of weights.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no weights.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.0.sum()
    }

    /// Weights as a slice, in asset order.
    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    /// Weights as a dense vector.
    pub fn as_vector(&self) -> &DVector<f64> {
        &self.0
    }

    /// Iterate over the weights.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }
}

impl Index<usize> for WeightVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// Minimum-variance allocation for a basket of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Asset identifiers, in weight order.
    pub assets: Vec<String>,
    /// Allocation weights.
    pub weights: WeightVector,
    /// Portfolio variance `w' Σ w`.
    pub achieved_risk: f64,
    /// Expected annual return `μ' w`.
    pub expected_return: f64,
    /// Solver iterations.
    pub iterations: u32,
    /// Method that produced the allocation.
    pub method: Method,
}

impl Allocation {
    /// Portfolio standard deviation.
    pub fn volatility(&self) -> f64 {
        self.achieved_risk.max(0.0).sqrt()
    }

    /// Weight of `asset`, if it is part of the basket.
    pub fn weight(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
    }

    /// Iterate over `(asset, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Asset to weight mapping.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(a, w)| (a.to_string(), w)).collect()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .assets
            .iter()
            .map(|a| a.len())
            .max()
            .unwrap_or(0)
            .max("Asset".len());

        writeln!(f, "{:<width$}  {:>14}", "Asset", "Allocation (%)", width = width)?;
        for (asset, w) in self.iter() {
            writeln!(f, "{:<width$}  {:>14.2}", asset, w * 100.0, width = width)?;
        }
        writeln!(f, "Expected return: {:.2}%", self.expected_return * 100.0)?;
        write!(f, "Volatility:      {:.2}%", self.volatility() * 100.0)
    }
}
