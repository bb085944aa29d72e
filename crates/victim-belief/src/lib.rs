//! Victim Belief: per-cell belief estimation for a search-and-rescue swarm
//!
//! Agents hold independent per-cell probabilities of victim presence, update
//! them from a noisy ground-truth feed inside a bounded window, and fuse them
//! hierarchically (agent → region leader → centralizer) with log-domain
//! Chernoff fusion weighted by recency, confidence, degradation and sensor
//! quality.

pub mod actors;
pub mod agent;
pub mod aggregator;
pub mod belief;
pub mod config;
pub mod divergence;
pub mod error;
pub mod fusion;
pub mod grid;
pub mod messages;
pub mod occupancy;
pub mod omega;
pub mod runtime;
pub mod sensor;
pub mod topology;

pub use agent::{Agent, AgentId, AgentReport};
pub use aggregator::{
    AggregatorState, EstimateLog, FusionStage, GlobalEstimate, HierarchicalAggregator,
    RegionEstimate, RoundResult,
};
pub use belief::{BeliefHistogram, BeliefVector};
pub use config::{MissingAgentPolicy, SwarmConfig};
pub use divergence::hellinger;
pub use error::{BeliefError, ConfigurationError, Result};
pub use fusion::{FusionEngine, FusionPolicy};
pub use grid::{GroundTruthGrid, ObservationEvent};
pub use occupancy::OccupancyEstimator;
pub use omega::{OmegaConfig, OmegaWeightEngine};
pub use runtime::AsyncSwarmBuilder;
pub use sensor::{BayesSensor, SensorModel};
pub use topology::{RegionId, RegionTopology, RemainderPolicy};
