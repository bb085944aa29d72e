//! SwarmCoordinator: the centralizer of the actor runtime.
//!
//! Owns the ground truth, the topology and the estimate history. A round
//! runs as:
//! 1. StartRound → ObserveRound (correlation_id) → every AgentActor
//! 2. AgentReported / AgentFailed → Coordinator (the barrier)
//! 3. RoundDeadline → Coordinator, excludes whoever has not reported
//! 4. Region fusion per leader, then global fusion
//! 5. RoundComplete → RoundDriver

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use acton_reactive::prelude::*;
use dashmap::DashMap;
use mti::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::agent::{AgentId, AgentReport};
use crate::aggregator::{EstimateLog, FusionStage, SwarmParts};
use crate::config::{MissingAgentPolicy, RoundConfig};
use crate::error::BeliefError;
use crate::grid::GroundTruthGrid;
use crate::messages::{
    AgentFailed, AgentReported, InjectObservations, ObserveRound, RegisterAgents,
    RegisterRoundDriver, RoundComplete, RoundDeadline, StartRound,
};
use crate::topology::RegionTopology;

/// The future a handler hands back to acton.
type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + Sync + 'static>>;

/// Reports collected for one round.
#[derive(Debug, Clone)]
struct PendingRound {
    round: u64,
    now: u64,
    /// Agents asked to report
    expected: HashSet<AgentId>,
    reports: Vec<AgentReport>,
    failed: Vec<AgentId>,
}

impl PendingRound {
    fn new(round: u64, now: u64, expected: HashSet<AgentId>, failed: Vec<AgentId>) -> Self {
        Self {
            round,
            now,
            expected,
            reports: Vec::new(),
            failed,
        }
    }

    fn is_complete(&self) -> bool {
        self.expected
            .iter()
            .all(|id| self.failed.contains(id) || self.reports.iter().any(|r| r.agent == *id))
    }

    /// Expected agents that neither reported nor failed.
    fn missing(&self) -> Vec<AgentId> {
        let mut missing: Vec<AgentId> = self
            .expected
            .iter()
            .copied()
            .filter(|id| !self.failed.contains(id) && !self.reports.iter().any(|r| r.agent == *id))
            .collect();
        missing.sort_unstable();
        missing
    }
}

/// Actor state for SwarmCoordinator.
#[derive(Default, Clone)]
pub struct SwarmCoordinatorState {
    grid: Option<GroundTruthGrid>,
    topology: Option<RegionTopology>,
    stage: Option<FusionStage>,
    round_config: Option<RoundConfig>,
    history: EstimateLog,
    /// Handles to AgentActors
    agents: DashMap<AgentId, ActorHandle>,
    /// Open rounds by correlation ID
    pending: DashMap<String, PendingRound>,
    /// Receives RoundComplete
    round_driver: Option<ActorHandle>,
    current_round: u64,
}

impl std::fmt::Debug for SwarmCoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmCoordinatorState")
            .field("grid", &self.grid.as_ref().map(GroundTruthGrid::len))
            .field("topology", &self.topology.is_some())
            .field("agents", &self.agents.len())
            .field("pending", &self.pending.len())
            .field("history", &self.history.len())
            .field("current_round", &self.current_round)
            .finish()
    }
}

/// Central coordinator actor for the swarm.
///
/// Agent actors are registered after spawn via `RegisterAgents`; the round
/// driver via `RegisterRoundDriver`.
pub struct SwarmCoordinator {
    pub grid: GroundTruthGrid,
    pub topology: RegionTopology,
    pub stage: FusionStage,
    pub round_config: RoundConfig,
    pub history: EstimateLog,
    pub round: u64,
}

impl SwarmCoordinator {
    pub fn new(
        grid: GroundTruthGrid,
        topology: RegionTopology,
        stage: FusionStage,
        round_config: RoundConfig,
    ) -> Self {
        Self {
            history: EstimateLog::new(round_config.history_capacity),
            grid,
            topology,
            stage,
            round_config,
            round: 0,
        }
    }

    /// Take over the non-agent parts of an assigned swarm.
    pub fn from_parts(parts: &SwarmParts) -> Self {
        Self {
            grid: parts.grid.clone(),
            topology: parts.topology.clone(),
            stage: parts.stage.clone(),
            round_config: parts.config.round,
            history: parts.history.clone(),
            round: parts.round,
        }
    }

    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor =
            runtime.new_actor_with_name::<SwarmCoordinatorState>("SwarmCoordinator".to_string());

        actor.model.grid = Some(self.grid);
        actor.model.topology = Some(self.topology);
        actor.model.stage = Some(self.stage);
        actor.model.round_config = Some(self.round_config);
        actor.model.history = self.history;
        actor.model.current_round = self.round;

        configure_handlers(&mut actor);

        actor.start().await
    }
}

/// Configure all message handlers for the coordinator.
fn configure_handlers(actor: &mut ManagedActor<Idle, SwarmCoordinatorState>) {
    actor.mutate_on::<RegisterAgents>(|actor, context| {
        let msg = context.message();
        actor.model.agents.clear();
        for (id, handle) in &msg.actors {
            actor.model.agents.insert(*id, handle.clone());
        }
        debug!(agents = actor.model.agents.len(), "Registered agent actors");
        Reply::ready()
    });

    actor.mutate_on::<RegisterRoundDriver>(|actor, context| {
        actor.model.round_driver = Some(context.message().handle.clone());
        debug!("Registered round driver");
        Reply::ready()
    });

    actor.mutate_on::<InjectObservations>(|actor, context| {
        let events = &context.message().events;
        let Some(grid) = actor.model.grid.as_mut() else {
            warn!("SwarmCoordinator: grid not initialized");
            return Reply::ready();
        };
        match grid.apply(events) {
            Ok(()) => trace!(events = events.len(), "Observations injected"),
            Err(e) => warn!(error = %e, "Rejected observation batch"),
        }
        Reply::ready()
    });

    actor.mutate_on::<StartRound>(|actor, context| {
        let now = context.message().now;

        let (Some(grid), Some(topology), Some(round_config)) = (
            actor.model.grid.as_ref(),
            actor.model.topology.as_ref(),
            actor.model.round_config,
        ) else {
            warn!("SwarmCoordinator: not initialized");
            return Reply::ready();
        };

        actor.model.current_round += 1;
        let round = actor.model.current_round;
        let correlation_id = "round".create_type_id::<V7>().to_string();
        let snapshot = Arc::new(grid.snapshot());

        // every assigned agent is expected; one without an actor has already failed
        let mut expected = HashSet::new();
        let mut failed = Vec::new();
        let mut targets = Vec::new();
        for id in topology.regions().iter().flat_map(|r| r.members.iter().copied()) {
            expected.insert(id);
            match actor.model.agents.get(&id) {
                Some(handle) => targets.push(handle.clone()),
                None => failed.push(id),
            }
        }

        info!(
            round,
            agents = targets.len(),
            unreachable = failed.len(),
            "Round started"
        );

        actor.model.pending.insert(
            correlation_id.clone(),
            PendingRound::new(round, now, expected, failed),
        );

        if targets.is_empty() {
            return complete(&mut actor.model, &correlation_id);
        }

        let self_handle = actor.handle().clone();
        let deadline = match round_config.missing_agents {
            MissingAgentPolicy::Exclude => Some(Duration::from_millis(round_config.report_timeout_ms)),
            MissingAgentPolicy::Stall => None,
        };

        Reply::pending(async move {
            for handle in targets {
                handle
                    .send(ObserveRound {
                        correlation_id: correlation_id.clone(),
                        round,
                        now,
                        snapshot: Arc::clone(&snapshot),
                    })
                    .await;
            }
            if let Some(deadline) = deadline {
                tokio::spawn(async move {
                    tokio::time::sleep(deadline).await;
                    self_handle.send(RoundDeadline { correlation_id }).await;
                });
            }
        })
    });

    actor.mutate_on::<AgentReported>(|actor, context| {
        let msg = context.message().clone();

        let Some(mut pending) = actor.model.pending.get_mut(&msg.correlation_id) else {
            warn!(
                correlation_id = %msg.correlation_id,
                agent = msg.report.agent,
                "Report for a closed or unknown round"
            );
            return Reply::ready();
        };
        pending.reports.push(msg.report);
        if !pending.is_complete() {
            return Reply::ready();
        }
        drop(pending);

        complete(&mut actor.model, &msg.correlation_id)
    });

    actor.mutate_on::<AgentFailed>(|actor, context| {
        let msg = context.message().clone();

        let Some(mut pending) = actor.model.pending.get_mut(&msg.correlation_id) else {
            return Reply::ready();
        };
        warn!(
            round = pending.round,
            agent = msg.agent,
            error = %msg.error,
            "Agent update failed"
        );
        pending.failed.push(msg.agent);
        if !pending.is_complete() {
            return Reply::ready();
        }
        drop(pending);

        complete(&mut actor.model, &msg.correlation_id)
    });

    actor.mutate_on::<RoundDeadline>(|actor, context| {
        let correlation_id = context.message().correlation_id.clone();

        let Some(mut pending) = actor.model.pending.get_mut(&correlation_id) else {
            // round already closed
            return Reply::ready();
        };
        let missing = pending.missing();
        warn!(
            round = pending.round,
            missing = ?missing,
            "Report deadline passed, excluding late agents"
        );
        pending.failed.extend(missing);
        drop(pending);

        complete(&mut actor.model, &correlation_id)
    });
}

/// Close the round and notify the driver.
fn complete(model: &mut SwarmCoordinatorState, correlation_id: &str) -> HandlerFuture {
    let outcome = finish_round(model, correlation_id);
    let driver = model.round_driver.clone();
    Box::pin(async move {
        match (outcome, driver) {
            (Some(outcome), Some(driver)) => {
                driver.send(outcome).await;
            }
            (Some(outcome), None) => {
                warn!(round = outcome.round, "Round finished with no driver registered");
            }
            _ => {}
        }
    })
}

/// Fuse a finished round and append it to the history.
fn finish_round(model: &mut SwarmCoordinatorState, correlation_id: &str) -> Option<RoundComplete> {
    let (_, pending) = model.pending.remove(correlation_id)?;
    let round = pending.round;

    let (Some(topology), Some(stage), Some(round_config)) =
        (model.topology.as_ref(), model.stage.as_ref(), model.round_config)
    else {
        warn!("SwarmCoordinator: not initialized");
        return None;
    };

    let result = if !pending.failed.is_empty()
        && round_config.missing_agents == MissingAgentPolicy::Stall
    {
        let mut missing = pending.failed.clone();
        missing.sort_unstable();
        Err(BeliefError::Stalled { round, missing })
    } else {
        stage.fuse(round, pending.now, topology, pending.reports, pending.failed)
    };

    match &result {
        Ok(result) => {
            model.history.push(result.estimate.clone());
            info!(
                round,
                participants = result.estimate.participants.len(),
                excluded = result.excluded.len(),
                mean_belief = %format!("{:.4}", result.estimate.belief.mean()),
                histogram = %result.estimate.histogram,
                "Round complete"
            );
        }
        Err(e) => warn!(round, error = %e, "Round failed"),
    }

    Some(RoundComplete { round, result })
}
