//! Adaptive fusion weights from four per-agent signals.
//!
//! Each signal is normalized across the participating agents, mixed with its
//! coefficient, and the mix is normalized again so weights sum to 1.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::AgentReport;
use crate::belief::EPSILON;
use crate::divergence::hellinger;
use crate::error::ConfigurationError;

/// Mixing coefficients for the four weight signals.
///
/// Not required to sum to 1; the mixed weights are renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmegaConfig {
    pub alpha_time: f64,
    pub alpha_confidence: f64,
    pub alpha_degradation: f64,
    pub alpha_sensor: f64,
}

impl Default for OmegaConfig {
    fn default() -> Self {
        Self {
            alpha_time: 0.25,
            alpha_confidence: 0.25,
            alpha_degradation: 0.25,
            alpha_sensor: 0.25,
        }
    }
}

impl OmegaConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("omega.alpha_time", self.alpha_time),
            ("omega.alpha_confidence", self.alpha_confidence),
            ("omega.alpha_degradation", self.alpha_degradation),
            ("omega.alpha_sensor", self.alpha_sensor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidParameter {
                    name,
                    value,
                    expected: "finite and >= 0",
                });
            }
        }
        Ok(())
    }
}

/// Raw, unnormalized signals for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSignals {
    /// `1 / (1 + max(1, now - last_update))`
    pub recency: f64,
    /// `1 - mean(occupancy)`
    pub confidence: f64,
    /// `1 - hellinger(belief, nominal)`
    pub degradation: f64,
    pub sensor_quality: f64,
}

impl WeightSignals {
    pub fn from_report(report: &AgentReport, now: u64) -> Result<Self, ConfigurationError> {
        let gap = now.saturating_sub(report.last_update).max(1);
        let recency = 1.0 / (1.0 + gap as f64);

        let confidence = if report.occupancy.is_empty() {
            1.0
        } else {
            1.0 - report.occupancy.iter().sum::<f64>() / report.occupancy.len() as f64
        };

        let distance = hellinger(report.belief.as_slice(), report.nominal.as_slice())?;

        Ok(Self {
            recency,
            confidence,
            degradation: 1.0 - distance,
            sensor_quality: report.sensor_quality,
        })
    }
}

/// Computes per-agent fusion weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct OmegaWeightEngine {
    config: OmegaConfig,
}

impl OmegaWeightEngine {
    pub fn new(config: OmegaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OmegaConfig {
        &self.config
    }

    /// One weight per report, in input order, summing to 1.
    ///
    /// An empty input yields an empty vector. Degenerate mixes (all zero or
    /// non-finite) fall back to uniform weights.
    pub fn weights(
        &self,
        reports: &[AgentReport],
        now: u64,
    ) -> Result<Vec<f64>, ConfigurationError> {
        let signals = reports
            .iter()
            .map(|r| WeightSignals::from_report(r, now))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.weights_from_signals(&signals))
    }

    pub fn weights_from_signals(&self, signals: &[WeightSignals]) -> Vec<f64> {
        match signals.len() {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }

        let recency = normalize(signals.iter().map(|s| s.recency));
        let confidence = normalize(signals.iter().map(|s| s.confidence));
        let degradation = normalize(signals.iter().map(|s| s.degradation));
        let sensor = normalize(signals.iter().map(|s| s.sensor_quality));

        let c = &self.config;
        let mixed: Vec<f64> = (0..signals.len())
            .map(|i| {
                c.alpha_time * recency[i]
                    + c.alpha_confidence * confidence[i]
                    + c.alpha_degradation * degradation[i]
                    + c.alpha_sensor * sensor[i]
            })
            .collect();

        let sum: f64 = mixed.iter().sum();
        if !sum.is_finite() || sum <= EPSILON || mixed.iter().any(|w| !w.is_finite() || *w < 0.0)
        {
            warn!(
                agents = signals.len(),
                "Degenerate omega weights, falling back to uniform"
            );
            let uniform = 1.0 / signals.len() as f64;
            return vec![uniform; signals.len()];
        }
        mixed.into_iter().map(|w| w / sum).collect()
    }
}

/// Divide by the sum plus epsilon.
fn normalize(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let values: Vec<f64> = values.collect();
    let sum: f64 = values.iter().sum();
    values.into_iter().map(|v| v / (sum + EPSILON)).collect()
}
