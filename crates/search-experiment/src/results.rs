//! Results collection and output for victim-search runs.
//!
//! Captures per round:
//! - Global belief summary and the 5-band histogram
//! - Participating and excluded agents
//! - The full global belief (history)
//!
//! plus the region topology the swarm ran with.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use victim_belief::{AgentId, BeliefHistogram, RegionTopology, RoundResult};

/// One region of the topology report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: usize,
    /// Half-open cell range `[start, end)`
    pub cells: (usize, usize),
    pub leader: Option<AgentId>,
    pub members: Vec<AgentId>,
}

impl RegionSummary {
    /// Region → (leader, members) listing, in region order.
    pub fn from_topology(topology: &RegionTopology) -> Vec<Self> {
        topology
            .regions()
            .iter()
            .map(|r| Self {
                region: r.id,
                cells: (r.cells.start, r.cells.end),
                leader: r.leader,
                members: r.members.clone(),
            })
            .collect()
    }
}

/// Metrics for a single round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundMetrics {
    pub round: u64,
    /// Victims injected before this round
    pub victims: usize,
    pub participants: usize,
    pub excluded: Vec<AgentId>,
    pub mean_belief: f64,
    pub max_belief: f64,
    pub histogram: BeliefHistogram,
    pub duration_ms: u64,
}

impl RoundMetrics {
    pub fn from_round(result: &RoundResult, victims: usize, duration_ms: u64) -> Self {
        let belief = &result.estimate.belief;
        Self {
            round: result.estimate.round,
            victims,
            participants: result.estimate.participants.len(),
            excluded: result.excluded.clone(),
            mean_belief: belief.mean(),
            max_belief: belief.as_slice().iter().copied().fold(0.0, f64::max),
            histogram: result.estimate.histogram,
            duration_ms,
        }
    }
}

/// A round that produced no estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRound {
    pub round: u64,
    pub error: String,
}

/// Configuration echoed into the results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub runtime: String,
    pub grid_size: usize,
    pub region_count: usize,
    pub agent_count: usize,
    pub observation_range: usize,
    pub rounds: usize,
    pub victims_per_round: usize,
    /// Random seed (if reproducible)
    pub seed: Option<u64>,
}

/// Results from a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub config: ExperimentConfig,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub topology: Vec<RegionSummary>,
    pub round_metrics: Vec<RoundMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_rounds: Vec<FailedRound>,
    /// Global belief after each completed round
    pub belief_history: Vec<Vec<f64>>,
    /// Accumulated ground truth at the end of the run
    pub ground_truth: Vec<f64>,
}

impl ExperimentResult {
    pub fn final_belief(&self) -> Option<&[f64]> {
        self.belief_history.last().map(Vec::as_slice)
    }

    pub fn final_histogram(&self) -> Option<BeliefHistogram> {
        self.round_metrics.last().map(|m| m.histogram)
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read results from {}", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
