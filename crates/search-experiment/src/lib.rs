//! Victim-search experiment: drives the victim-belief swarm against a
//! synthetic schedule of victims.
//!
//! - `scenario`: seeded per-round victim batches
//! - `experiment`: the round loop on either runtime
//! - `results`: per-round metrics, belief history and the topology report

pub mod experiment;
pub mod results;
pub mod scenario;
