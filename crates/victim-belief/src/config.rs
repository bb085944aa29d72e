//! Configuration types for the swarm.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::fusion::FusionPolicy;
use crate::occupancy::DEFAULT_L_BAR;
use crate::omega::OmegaConfig;
use crate::sensor::SensorConfig;
use crate::topology::PartitionConfig;

/// Top-level swarm configuration.
///
/// Defines the workspace, the swarm, the sensor model and how each tier
/// fuses. Loaded from TOML/JSON at runtime and validated before any state
/// is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Number of cells in the workspace
    pub grid_size: usize,

    /// Number of contiguous regions
    pub region_count: usize,

    /// Number of agents
    pub agent_count: usize,

    /// Cells observed beyond each side of an agent's region
    pub observation_range: usize,

    /// Occupancy confidence parameter (l-bar)
    pub l_bar: f64,

    /// Uniform initial belief for agents without an override
    pub initial_belief: f64,

    /// Uniform nominal reference belief
    pub nominal_belief: f64,

    /// Sensor quality for agents without an override
    pub default_sensor_quality: f64,

    /// Per-agent overrides, indexed by agent id
    pub agents: Vec<AgentConfig>,

    pub sensor: SensorConfig,

    pub omega: OmegaConfig,

    pub fusion: FusionConfig,

    pub partition: PartitionConfig,

    pub round: RoundConfig,
}

/// Per-agent overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Static sensor quality; falls back to `default_sensor_quality`
    pub sensor_quality: Option<f64>,

    /// Full initial belief vector (length `grid_size`)
    pub initial_belief: Option<Vec<f64>>,
}

/// Fusion policy per tier.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FusionConfig {
    /// How a leader combines its region's members
    pub region_policy: FusionPolicy,

    /// How the centralizer combines region estimates
    pub global_policy: FusionPolicy,
}

/// What a round does about agents that fail or never report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAgentPolicy {
    /// Drop the agent from this round's fusion and renormalize weights
    #[default]
    Exclude,
    /// Fail the round (synchronous) or wait without a deadline (actors)
    Stall,
}

/// Round protocol configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RoundConfig {
    pub missing_agents: MissingAgentPolicy,

    /// Deadline for agent reports in the actor runtime (milliseconds)
    pub report_timeout_ms: u64,

    /// Keep at most this many global estimates; `None` keeps all
    pub history_capacity: Option<usize>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            missing_agents: MissingAgentPolicy::Exclude,
            report_timeout_ms: 250,
            history_capacity: None,
        }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            grid_size: 100,
            region_count: 5,
            agent_count: 10,
            observation_range: 2,
            l_bar: DEFAULT_L_BAR,
            initial_belief: 0.5,
            nominal_belief: 0.5,
            default_sensor_quality: 0.7,
            agents: Vec::new(),
            sensor: SensorConfig::default(),
            omega: OmegaConfig::default(),
            fusion: FusionConfig::default(),
            partition: PartitionConfig::default(),
            round: RoundConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Load from a `.toml` or `.json` file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Load(format!("{}: {}", path.display(), e)))?;
        let config: SwarmConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| ConfigurationError::Load(format!("{}: {}", path.display(), e)))?,
            Some("toml") => toml::from_str(&text)
                .map_err(|e| ConfigurationError::Load(format!("{}: {}", path.display(), e)))?,
            other => {
                return Err(ConfigurationError::Load(format!(
                    "{}: unsupported extension {:?}",
                    path.display(),
                    other
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every caller contract that would otherwise fail silently.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.grid_size == 0 {
            return Err(ConfigurationError::ZeroGridSize);
        }
        if self.region_count == 0 {
            return Err(ConfigurationError::ZeroRegions);
        }
        if self.agent_count == 0 {
            return Err(ConfigurationError::Empty { what: "swarm" });
        }
        if !(self.l_bar > 0.0 && self.l_bar < 1.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "l_bar",
                value: self.l_bar,
                expected: "(0, 1)",
            });
        }
        for (name, value) in [
            ("initial_belief", self.initial_belief),
            ("nominal_belief", self.nominal_belief),
            ("default_sensor_quality", self.default_sensor_quality),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidParameter {
                    name,
                    value,
                    expected: "[0, 1]",
                });
            }
        }
        if self.agents.len() > self.agent_count {
            return Err(ConfigurationError::LengthMismatch {
                what: "agent overrides",
                expected: self.agent_count,
                actual: self.agents.len(),
            });
        }
        for agent in &self.agents {
            if let Some(quality) = agent.sensor_quality
                && !(quality.is_finite() && quality >= 0.0)
            {
                return Err(ConfigurationError::InvalidParameter {
                    name: "agents.sensor_quality",
                    value: quality,
                    expected: "finite and >= 0",
                });
            }
            if let Some(belief) = &agent.initial_belief {
                if belief.len() != self.grid_size {
                    return Err(ConfigurationError::LengthMismatch {
                        what: "agents.initial_belief",
                        expected: self.grid_size,
                        actual: belief.len(),
                    });
                }
                if let Some((index, &value)) = belief
                    .iter()
                    .enumerate()
                    .find(|(_, v)| !(0.0..=1.0).contains(*v))
                {
                    return Err(ConfigurationError::InvalidProbability {
                        what: "agents.initial_belief",
                        index,
                        value,
                    });
                }
            }
        }
        for policy in [self.fusion.region_policy, self.fusion.global_policy] {
            if let FusionPolicy::LegacyFold { omega } = policy
                && !(0.0..=1.0).contains(&omega)
            {
                return Err(ConfigurationError::InvalidParameter {
                    name: "fusion.omega",
                    value: omega,
                    expected: "[0, 1]",
                });
            }
        }
        if self.round.history_capacity == Some(0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "round.history_capacity",
                value: 0.0,
                expected: ">= 1 or unset",
            });
        }
        self.sensor.validate()?;
        self.omega.validate()?;
        crate::topology::RegionTopology::partition(
            self.grid_size,
            self.region_count,
            self.partition.remainder,
        )?;
        Ok(())
    }
}
