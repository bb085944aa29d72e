//! Message types for acton-reactive actor communication.
//!
//! Rounds are tracked with correlation IDs (via mti) so late reports from a
//! previous round are recognised and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use acton_reactive::prelude::ActorHandle;

use crate::agent::{AgentId, AgentReport};
use crate::aggregator::RoundResult;
use crate::error::BeliefError;
use crate::grid::{GroundTruthGrid, ObservationEvent};

/// Ask an agent to update against this round's snapshot - sent to AgentActors.
#[derive(Debug, Clone)]
pub struct ObserveRound {
    /// Correlation ID of the round
    pub correlation_id: String,
    pub round: u64,
    pub now: u64,
    /// Read-only ground truth shared by every agent this round
    pub snapshot: Arc<GroundTruthGrid>,
}

/// An agent finished its update - sent back to the coordinator.
#[derive(Debug, Clone)]
pub struct AgentReported {
    pub correlation_id: String,
    pub report: AgentReport,
}

/// An agent's update failed; its belief is unchanged.
#[derive(Debug, Clone)]
pub struct AgentFailed {
    pub correlation_id: String,
    pub agent: AgentId,
    pub error: BeliefError,
}

/// Add intensities to the ground truth before the next round.
#[derive(Debug, Clone)]
pub struct InjectObservations {
    pub events: Vec<ObservationEvent>,
}

/// Start a round at time `now`.
#[derive(Debug, Clone)]
pub struct StartRound {
    pub now: u64,
}

/// Report deadline for a round - scheduled by the coordinator to itself.
#[derive(Debug, Clone)]
pub struct RoundDeadline {
    pub correlation_id: String,
}

/// Outcome of a round - sent to the registered round driver.
#[derive(Debug, Clone)]
pub struct RoundComplete {
    pub round: u64,
    pub result: Result<RoundResult, BeliefError>,
}

/// Register the actor that receives `RoundComplete`.
#[derive(Debug, Clone)]
pub struct RegisterRoundDriver {
    pub handle: ActorHandle,
}

/// Register agent actors with the coordinator, replacing any earlier set.
#[derive(Debug, Clone)]
pub struct RegisterAgents {
    pub actors: HashMap<AgentId, ActorHandle>,
}
