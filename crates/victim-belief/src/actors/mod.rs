//! Acton-reactive actors for the round protocol.
//!
//! Uses message correlation (via mti) to track one round at a time:
//!
//! ```text
//! InjectObservations → Coordinator (applied to the ground truth)
//! StartRound → Coordinator
//!   ├─ ObserveRound (correlation_id, Arc snapshot) → AgentActors (concurrent)
//!   │   └─ AgentReported | AgentFailed → Coordinator
//!   ├─ RoundDeadline (correlation_id) → Coordinator, after report_timeout_ms
//!   ├─ region fusion per leader, global fusion, history append
//!   └─ RoundComplete → RoundDriver → mpsc
//! ```
//!
//! Each AgentActor owns its agent, so updates in one round run in parallel
//! while any one agent only ever sees one round at a time.

mod agent_actor;
mod coordinator;
mod round_driver;

pub use agent_actor::{AgentActor, AgentActorState};
pub use coordinator::{SwarmCoordinator, SwarmCoordinatorState};
pub use round_driver::{RoundDriver, RoundDriverState};
