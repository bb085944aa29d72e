//! Error types for belief estimation and swarm aggregation.

use thiserror::Error;

use crate::agent::AgentId;

/// A caller contract was violated while building or feeding the swarm.
///
/// Raised at setup time (config validation, partitioning) or at the
/// boundary of a fusion call. Never raised for numeric edge cases, which
/// degrade to guarded fallbacks instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("grid size must be at least 1")]
    ZeroGridSize,

    #[error("region count must be at least 1")]
    ZeroRegions,

    #[error("{regions} regions cannot partition a grid of {grid_size} cells")]
    TooManyRegions { regions: usize, grid_size: usize },

    #[error("grid size {grid_size} is not divisible by region count {regions}")]
    IndivisibleGrid { grid_size: usize, regions: usize },

    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("fusion weights sum to {sum:.6}, expected 1")]
    WeightSum { sum: f64 },

    #[error("fusion weight {value} at position {index} is negative or not finite")]
    InvalidWeight { index: usize, value: f64 },

    #[error("{what} must not be empty")]
    Empty { what: &'static str },

    #[error("{what} holds {value} at position {index}, outside [0, 1]")]
    InvalidProbability {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{what} holds {value} at position {index}, expected a finite nonnegative value")]
    InvalidMagnitude {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error("parameter {name} = {value} is out of range ({expected})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("agent id {0} appears more than once")]
    DuplicateAgent(AgentId),

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Errors surfaced by grid access, agent updates and the round protocol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BeliefError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("index {index} is out of range for a grid of {len} cells")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("aggregator is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("agent {agent} failed to update: {reason}")]
    Sensor { agent: AgentId, reason: String },

    #[error("round {round} finished without any reporting agent")]
    NoParticipants { round: u64 },

    #[error("round {round} stalled waiting for agents {missing:?}")]
    Stalled { round: u64, missing: Vec<AgentId> },
}

pub type Result<T> = std::result::Result<T, BeliefError>;
