//! Sensor models: how one observed intensity moves one prior belief cell.
//!
//! The `SensorModel` trait is the seam between the ground-truth feed and an
//! agent's belief. Models are synchronous local computations applied per cell
//! inside the agent's observation window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::belief::EPSILON;
use crate::error::ConfigurationError;
use crate::fusion::DEFAULT_OMEGA;

/// A per-cell observation model.
///
/// Must be deterministic and free of I/O. Returning `Ok(None)` leaves the
/// prior untouched; returning an error fails the owning agent's update for
/// the whole round.
pub trait SensorModel: Send + Sync {
    /// Unique name for this model.
    fn name(&self) -> &str;

    /// Posterior for a cell with prior `prior` after observing accumulated
    /// intensity `intensity`.
    fn posterior(&self, prior: f64, intensity: f64) -> anyhow::Result<Option<f64>>;
}

/// Which built-in model agents use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    #[default]
    Bayes,
    Chernoff,
}

/// Sensor settings shared by every agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    pub mode: SensorMode,
    /// P(z | occupied)
    pub p_detect_occupied: f64,
    /// P(z | free)
    pub p_detect_free: f64,
    /// Leave cells with zero accumulated intensity at their prior
    pub skip_silent_cells: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mode: SensorMode::Bayes,
            p_detect_occupied: 0.8,
            p_detect_free: 0.1,
            skip_silent_cells: true,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("sensor.p_detect_occupied", self.p_detect_occupied),
            ("sensor.p_detect_free", self.p_detect_free),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidParameter {
                    name,
                    value,
                    expected: "[0, 1]",
                });
            }
        }
        Ok(())
    }

    /// Build the configured model.
    pub fn build(&self) -> Arc<dyn SensorModel> {
        match self.mode {
            SensorMode::Bayes => Arc::new(BayesSensor {
                p_detect_occupied: self.p_detect_occupied,
                p_detect_free: self.p_detect_free,
                skip_silent_cells: self.skip_silent_cells,
            }),
            SensorMode::Chernoff => Arc::new(ChernoffObservation {
                omega: DEFAULT_OMEGA,
                skip_silent_cells: self.skip_silent_cells,
            }),
        }
    }
}

/// Fixed-likelihood Bayesian detector.
///
/// `posterior = p_occ·prior / (p_occ·prior + p_free·(1-prior) + ε)`.
/// The observed intensity only decides whether the cell carries a detection
/// at all; its magnitude does not enter the update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BayesSensor {
    pub p_detect_occupied: f64,
    pub p_detect_free: f64,
    pub skip_silent_cells: bool,
}

impl Default for BayesSensor {
    fn default() -> Self {
        Self {
            p_detect_occupied: 0.8,
            p_detect_free: 0.1,
            skip_silent_cells: true,
        }
    }
}

impl SensorModel for BayesSensor {
    fn name(&self) -> &str {
        "bayes"
    }

    fn posterior(&self, prior: f64, intensity: f64) -> anyhow::Result<Option<f64>> {
        if self.skip_silent_cells && intensity == 0.0 {
            return Ok(None);
        }
        let numerator = self.p_detect_occupied * prior;
        let denominator = numerator + self.p_detect_free * (1.0 - prior);
        Ok(Some(numerator / (denominator + EPSILON)))
    }
}

/// Log-domain fusion of the prior with the raw observed intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChernoffObservation {
    pub omega: f64,
    pub skip_silent_cells: bool,
}

impl SensorModel for ChernoffObservation {
    fn name(&self) -> &str {
        "chernoff"
    }

    fn posterior(&self, prior: f64, intensity: f64) -> anyhow::Result<Option<f64>> {
        if self.skip_silent_cells && intensity == 0.0 {
            return Ok(None);
        }
        let log = self.omega * (prior + EPSILON).ln()
            + (1.0 - self.omega) * (intensity + EPSILON).ln();
        let posterior = log.exp();
        if !posterior.is_finite() {
            anyhow::bail!("non-finite posterior from prior {prior} and intensity {intensity}");
        }
        Ok(Some(posterior.clamp(0.0, 1.0)))
    }
}
