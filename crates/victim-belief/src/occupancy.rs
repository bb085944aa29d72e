//! Soft occupancy from a log-likelihood ratio against the nominal reference.

use crate::belief::{BeliefVector, EPSILON};
use crate::error::ConfigurationError;

/// Default confidence parameter `l̄`.
pub const DEFAULT_L_BAR: f64 = 0.95;

/// Turns a belief into a per-cell confidence in (0, 1) that the cell holds
/// more evidence than the nominal reference.
///
/// `occupancy[i] = sigmoid(ln(b[i]+ε) - ln(n[i]+ε) - ln(l̄/(1-l̄)))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyEstimator {
    l_bar: f64,
    threshold: f64,
}

impl OccupancyEstimator {
    pub fn new(l_bar: f64) -> Result<Self, ConfigurationError> {
        if !(l_bar > 0.0 && l_bar < 1.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "l_bar",
                value: l_bar,
                expected: "(0, 1)",
            });
        }
        Ok(Self {
            l_bar,
            threshold: (l_bar / (1.0 - l_bar)).ln(),
        })
    }

    pub fn l_bar(&self) -> f64 {
        self.l_bar
    }

    /// Log-odds decision boundary.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn estimate(
        &self,
        belief: &BeliefVector,
        nominal: &BeliefVector,
    ) -> Result<Vec<f64>, ConfigurationError> {
        if belief.len() != nominal.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "nominal belief",
                expected: belief.len(),
                actual: nominal.len(),
            });
        }
        Ok(belief
            .as_slice()
            .iter()
            .zip(nominal.as_slice())
            .map(|(b, n)| {
                let llr = (b + EPSILON).ln() - (n + EPSILON).ln();
                sigmoid(llr - self.threshold)
            })
            .collect())
    }
}

impl Default for OccupancyEstimator {
    fn default() -> Self {
        Self {
            l_bar: DEFAULT_L_BAR,
            threshold: (DEFAULT_L_BAR / (1.0 - DEFAULT_L_BAR)).ln(),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
