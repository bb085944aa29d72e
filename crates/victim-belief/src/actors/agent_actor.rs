//! AgentActor: sole owner of one agent's belief.
//!
//! The mailbox serializes updates, so an agent never sees two rounds at once
//! and nobody else can touch its belief.

use acton_reactive::prelude::*;
use tracing::{error, trace};

use crate::agent::{Agent, AgentId};
use crate::messages::{AgentFailed, AgentReported, ObserveRound};

/// Actor state for AgentActor.
#[derive(Default, Clone)]
pub struct AgentActorState {
    agent: Option<Agent>,
    /// Handle to the coordinator for sending reports
    coordinator: Option<ActorHandle>,
}

impl std::fmt::Debug for AgentActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentActorState")
            .field("agent", &self.agent.as_ref().map(Agent::id))
            .field("coordinator", &self.coordinator.is_some())
            .finish()
    }
}

/// Actor wrapper for an [`Agent`].
///
/// Handles `ObserveRound` by updating against the round's snapshot and
/// replying `AgentReported` or `AgentFailed` to the coordinator.
pub struct AgentActor {
    pub agent: Agent,
    pub coordinator: ActorHandle,
}

impl AgentActor {
    pub fn new(agent: Agent, coordinator: ActorHandle) -> Self {
        Self { agent, coordinator }
    }

    pub fn id(&self) -> AgentId {
        self.agent.id()
    }

    /// Spawn this agent actor in the given runtime.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor =
            runtime.new_actor_with_name::<AgentActorState>(format!("Agent:{}", self.agent.id()));

        actor.model.agent = Some(self.agent);
        actor.model.coordinator = Some(self.coordinator);

        // mutate_on = one update at a time
        actor.mutate_on::<ObserveRound>(|actor, context| {
            let msg = context.message().clone();

            let Some(coordinator) = actor.model.coordinator.clone() else {
                error!("AgentActor: coordinator not set");
                return Reply::ready();
            };
            let Some(agent) = actor.model.agent.as_mut() else {
                error!("AgentActor: agent not initialized");
                return Reply::ready();
            };
            let id = agent.id();

            match agent.observe(&msg.snapshot, msg.now) {
                Ok(report) => {
                    trace!(agent = id, round = msg.round, "Agent reporting");
                    Reply::pending(async move {
                        coordinator
                            .send(AgentReported {
                                correlation_id: msg.correlation_id,
                                report,
                            })
                            .await;
                    })
                }
                Err(error) => Reply::pending(async move {
                    coordinator
                        .send(AgentFailed {
                            correlation_id: msg.correlation_id,
                            agent: id,
                            error,
                        })
                        .await;
                }),
            }
        });

        actor.start().await
    }
}
