//! Belief vectors: per-cell, independently held probabilities of victim presence.
//!
//! Cells are marginal probabilities, not a joint distribution, so nothing in
//! this module renormalizes across cells.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Guard added before every logarithm and division.
pub const EPSILON: f64 = 1e-10;

/// Floor applied to stored values before taking their logarithm.
const LOG_FLOOR: f64 = 1e-10;

/// Belief-magnitude band edges used by the diagnostic histogram.
pub const HISTOGRAM_THRESHOLDS: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.01];

/// An owned per-cell probability estimate.
///
/// Owned by exactly one agent, leader or centralizer. Readers receive copies
/// through [`BeliefVector::get`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BeliefVector {
    values: Vec<f64>,
}

impl BeliefVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// A vector of `len` cells all holding `p`.
    pub fn uniform(len: usize, p: f64) -> Self {
        Self {
            values: vec![p; len],
        }
    }

    /// Build a vector after checking every cell lies in [0, 1].
    pub fn try_from_probabilities(
        values: Vec<f64>,
        what: &'static str,
    ) -> Result<Self, ConfigurationError> {
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(ConfigurationError::InvalidProbability { what, index, value });
        }
        Ok(Self { values })
    }

    /// Copy of the stored values.
    pub fn get(&self) -> Vec<f64> {
        self.values.clone()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Replace the whole vector. No normalization or range check.
    pub fn update(&mut self, values: Vec<f64>) {
        self.values = values;
    }

    /// Natural log of each cell, floored at 1e-10 so no cell maps to -inf.
    pub fn log(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.max(LOG_FLOOR).ln()).collect()
    }

    /// Element-wise exponential of the stored values.
    pub fn exp(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.exp()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

impl Index<usize> for BeliefVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

impl From<Vec<f64>> for BeliefVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for BeliefVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:.3}", v)?;
        }
        write!(f, "]")
    }
}

/// Cell counts per belief-magnitude band.
///
/// Bands follow [`HISTOGRAM_THRESHOLDS`]: every band is half-open except the
/// last, which also includes its upper edge. Values outside [0, 1.01] are not
/// counted. This is the data contract consumed by visualisation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BeliefHistogram {
    pub counts: [usize; 5],
}

impl BeliefHistogram {
    pub fn from_values(values: &[f64]) -> Self {
        let edges = HISTOGRAM_THRESHOLDS;
        let last = edges.len() - 2;
        let mut counts = [0usize; 5];
        for &v in values {
            if !(edges[0]..=edges[last + 1]).contains(&v) {
                continue;
            }
            let band = (0..=last)
                .find(|&b| v < edges[b + 1])
                .unwrap_or(last);
            counts[band] += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl fmt::Display for BeliefHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges = HISTOGRAM_THRESHOLDS;
        for (band, count) in self.counts.iter().enumerate() {
            if band > 0 {
                write!(f, " ")?;
            }
            let close = if band + 1 == self.counts.len() { ']' } else { ')' };
            write!(f, "[{}-{}{}:{}", edges[band], edges[band + 1], close, count)?;
        }
        Ok(())
    }
}
