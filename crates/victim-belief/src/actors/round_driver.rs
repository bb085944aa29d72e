//! Round driver actor: bridges `RoundComplete` into an mpsc channel so a
//! harness can await rounds outside the actor system.

use acton_reactive::prelude::*;
use tokio::sync::mpsc;

use crate::messages::RoundComplete;

/// State for the round driver actor.
#[derive(Default, Clone)]
pub struct RoundDriverState {
    tx: Option<mpsc::Sender<RoundComplete>>,
}

impl std::fmt::Debug for RoundDriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundDriverState")
            .field("has_tx", &self.tx.is_some())
            .finish()
    }
}

/// Forwards every `RoundComplete` it receives to a channel.
///
/// Register the returned handle with the coordinator via
/// `RegisterRoundDriver`.
pub struct RoundDriver {
    tx: mpsc::Sender<RoundComplete>,
}

impl RoundDriver {
    pub fn new(tx: mpsc::Sender<RoundComplete>) -> Self {
        Self { tx }
    }

    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor = runtime.new_actor_with_name::<RoundDriverState>("RoundDriver".to_string());

        actor.model.tx = Some(self.tx);

        actor.act_on::<RoundComplete>(|actor, context| {
            let outcome = context.message().clone();
            let tx = actor.model.tx.clone();

            Reply::pending(async move {
                if let Some(tx) = tx {
                    // receiver may be gone after shutdown
                    let _ = tx.send(outcome).await;
                }
            })
        });

        actor.start().await
    }
}
