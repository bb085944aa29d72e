//! The actor rendition of the swarm.
//!
//! ## Usage
//!
//! ```ignore
//! use victim_belief::{AsyncSwarmBuilder, HierarchicalAggregator, SwarmConfig};
//! use acton_reactive::prelude::*;
//!
//! let mut swarm = HierarchicalAggregator::new(config)?;
//! swarm.partition()?;
//! swarm.assign_agents()?;
//!
//! let mut runtime = ActonApp::launch_async().await;
//! let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//! let driver = RoundDriver::new(tx).spawn(&mut runtime).await;
//! let coordinator = AsyncSwarmBuilder::new(swarm).spawn(&mut runtime).await?;
//! coordinator.send(RegisterRoundDriver { handle: driver }).await;
//!
//! coordinator.send(InjectObservations { events }).await;
//! coordinator.send(StartRound { now: 1 }).await;
//! let outcome = rx.recv().await;
//! ```

use std::collections::HashMap;

use acton_reactive::prelude::*;
use tracing::debug;

use crate::actors::{AgentActor, SwarmCoordinator};
use crate::aggregator::HierarchicalAggregator;
use crate::error::Result;
use crate::messages::RegisterAgents;

/// Builder for running an assigned swarm on the actor runtime.
///
/// Spawns one AgentActor per agent plus the coordinator, which takes over
/// the ground truth, topology and history from the aggregator.
pub struct AsyncSwarmBuilder {
    swarm: HierarchicalAggregator,
}

impl AsyncSwarmBuilder {
    /// The aggregator must already be partitioned and assigned.
    pub fn new(swarm: HierarchicalAggregator) -> Self {
        Self { swarm }
    }

    /// Spawn the coordinator and agent actors; returns the coordinator's
    /// handle. Drive rounds with `InjectObservations` and `StartRound`.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> Result<ActorHandle> {
        let parts = self.swarm.into_parts()?;

        let coordinator_handle = SwarmCoordinator::from_parts(&parts).spawn(runtime).await;

        let mut agents = HashMap::new();
        for agent in parts.agents {
            let id = agent.id();
            let handle = AgentActor::new(agent, coordinator_handle.clone())
                .spawn(runtime)
                .await;
            agents.insert(id, handle);
        }
        debug!(agents = agents.len(), "Agent actors spawned");

        coordinator_handle
            .send(RegisterAgents { actors: agents })
            .await;

        Ok(coordinator_handle)
    }
}
