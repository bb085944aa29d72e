//! The hierarchical round protocol: agent update, region fusion by leaders,
//! global fusion by the centralizer.
//!
//! Phases are separated by hard barriers. The update phase runs every agent
//! in parallel against one read-only ground-truth snapshot; the region phase
//! runs every leader in parallel since regions are disjoint; the global phase
//! has a single writer.
//!
//! ```ignore
//! let mut swarm = HierarchicalAggregator::new(SwarmConfig::default())?;
//! swarm.partition()?;
//! swarm.assign_agents()?;
//! swarm.apply_events(&[ObservationEvent::new(3, 0.9)])?;
//! let result = swarm.run_round(1)?;
//! println!("{}", result.estimate.histogram);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentId, AgentReport};
use crate::belief::{BeliefHistogram, BeliefVector};
use crate::config::{FusionConfig, MissingAgentPolicy, SwarmConfig};
use crate::error::{BeliefError, ConfigurationError, Result};
use crate::fusion::{FusionEngine, FusionPolicy};
use crate::grid::{GroundTruthGrid, ObservationEvent};
use crate::occupancy::OccupancyEstimator;
use crate::omega::{OmegaWeightEngine, WeightSignals};
use crate::topology::{Region, RegionId, RegionTopology};

/// Lifecycle of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatorState {
    Unpartitioned,
    Partitioned,
    RoundInProgress,
    RoundComplete,
}

impl AggregatorState {
    pub fn name(&self) -> &'static str {
        match self {
            AggregatorState::Unpartitioned => "unpartitioned",
            AggregatorState::Partitioned => "partitioned",
            AggregatorState::RoundInProgress => "round in progress",
            AggregatorState::RoundComplete => "round complete",
        }
    }
}

/// A leader's fused belief for one region in one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionEstimate {
    pub region: RegionId,
    /// The member that fused this round: the elected leader, or the lowest
    /// reporting member when the leader was excluded.
    pub acting_leader: AgentId,
    /// Reporting members, in fusion order.
    pub members: Vec<AgentId>,
    /// Fusion weights per member; empty under the legacy fold.
    pub weights: Vec<f64>,
    pub belief: BeliefVector,
}

/// One entry of the centralizer's history. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalEstimate {
    pub round: u64,
    pub time: u64,
    pub belief: BeliefVector,
    pub occupancy: Vec<f64>,
    pub histogram: BeliefHistogram,
    /// Agents whose updates were fused this round
    pub participants: Vec<AgentId>,
}

/// Everything a completed round produced.
#[derive(Debug, Clone, Serialize)]
pub struct RoundResult {
    pub estimate: GlobalEstimate,
    pub regions: Vec<RegionEstimate>,
    /// Agents dropped from this round (failed or late)
    pub excluded: Vec<AgentId>,
    /// Updated belief of each participant
    #[serde(skip)]
    pub agent_beliefs: BTreeMap<AgentId, BeliefVector>,
}

/// Append-only log of global estimates.
///
/// Unbounded unless a capacity is set, in which case the oldest entry is
/// evicted on overflow.
#[derive(Debug, Clone, Default)]
pub struct EstimateLog {
    entries: VecDeque<GlobalEstimate>,
    capacity: Option<usize>,
}

impl EstimateLog {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, estimate: GlobalEstimate) {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity.max(1) {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(estimate);
    }

    pub fn latest(&self) -> Option<&GlobalEstimate> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobalEstimate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Region and global fusion for one round, shared by the synchronous
/// aggregator and the actor coordinator.
#[derive(Debug, Clone)]
pub struct FusionStage {
    fusion: FusionConfig,
    omega: OmegaWeightEngine,
    estimator: OccupancyEstimator,
    nominal: Arc<BeliefVector>,
}

impl FusionStage {
    pub fn new(
        fusion: FusionConfig,
        omega: OmegaWeightEngine,
        estimator: OccupancyEstimator,
        nominal: Arc<BeliefVector>,
    ) -> Self {
        Self {
            fusion,
            omega,
            estimator,
            nominal,
        }
    }

    pub fn from_config(config: &SwarmConfig) -> std::result::Result<Self, ConfigurationError> {
        Ok(Self::new(
            config.fusion,
            OmegaWeightEngine::new(config.omega),
            OccupancyEstimator::new(config.l_bar)?,
            Arc::new(BeliefVector::uniform(config.grid_size, config.nominal_belief)),
        ))
    }

    pub fn nominal(&self) -> &Arc<BeliefVector> {
        &self.nominal
    }

    /// Fuse the collected reports of one round.
    ///
    /// `reports` holds only the agents that completed their update; anyone
    /// else in `excluded` is left out and the weights renormalize over the
    /// reporters. Fails with [`BeliefError::NoParticipants`] when no region
    /// produced an estimate.
    pub fn fuse(
        &self,
        round: u64,
        now: u64,
        topology: &RegionTopology,
        mut reports: Vec<AgentReport>,
        mut excluded: Vec<AgentId>,
    ) -> Result<RoundResult> {
        reports.sort_by_key(|r| r.agent);
        excluded.sort_unstable();
        excluded.dedup();

        // barrier: all updates are in before any leader reads them
        let regions = topology
            .regions()
            .par_iter()
            .map(|region| {
                fuse_region(
                    region,
                    &reports,
                    self.fusion.region_policy,
                    &self.omega,
                    now,
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let regions: Vec<RegionEstimate> = regions.into_iter().flatten().collect();

        // barrier: every leader has finished before the centralizer runs
        let Some(belief) = fuse_global(&regions, self.fusion.global_policy)? else {
            return Err(BeliefError::NoParticipants { round });
        };

        let occupancy = self.estimator.estimate(&belief, &self.nominal)?;
        let histogram = BeliefHistogram::from_values(belief.as_slice());
        let participants: Vec<AgentId> = regions
            .iter()
            .flat_map(|r| r.members.iter().copied())
            .collect();
        let agent_beliefs = reports
            .into_iter()
            .filter(|r| participants.contains(&r.agent))
            .map(|r| (r.agent, r.belief))
            .collect();

        Ok(RoundResult {
            estimate: GlobalEstimate {
                round,
                time: now,
                belief,
                occupancy,
                histogram,
                participants,
            },
            regions,
            excluded,
            agent_beliefs,
        })
    }
}

/// Fuse the reports of one region's members.
///
/// Members fuse in ascending id order, so the leader goes first. Returns
/// `None` when no member of the region reported.
pub fn fuse_region(
    region: &Region,
    reports: &[AgentReport],
    policy: FusionPolicy,
    omega: &OmegaWeightEngine,
    now: u64,
) -> std::result::Result<Option<RegionEstimate>, ConfigurationError> {
    let mut members: Vec<&AgentReport> = reports
        .iter()
        .filter(|r| region.members.contains(&r.agent))
        .collect();
    members.sort_by_key(|r| r.agent);
    let Some(first) = members.first() else {
        warn!(region = region.id, "No reporting members, region skipped");
        return Ok(None);
    };
    let acting_leader = first.agent;
    if region.leader != Some(acting_leader) {
        warn!(
            region = region.id,
            leader = ?region.leader,
            acting_leader,
            "Leader excluded, lowest reporting member fuses instead"
        );
    }

    let beliefs: Vec<&BeliefVector> = members.iter().map(|r| &r.belief).collect();
    let weights = match policy {
        FusionPolicy::Weighted => {
            let signals = members
                .iter()
                .map(|r| WeightSignals::from_report(r, now))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            omega.weights_from_signals(&signals)
        }
        FusionPolicy::LegacyFold { .. } => Vec::new(),
    };
    let belief = FusionEngine::new().combine(policy, &beliefs, &weights)?;

    debug!(
        region = region.id,
        acting_leader,
        members = members.len(),
        weights = ?weights,
        "Region fused"
    );

    Ok(Some(RegionEstimate {
        region: region.id,
        acting_leader,
        members: members.iter().map(|r| r.agent).collect(),
        weights,
        belief,
    }))
}

/// Fuse region estimates into the global belief, in region order.
///
/// Weighted fusion gives each region `1/R'`. Returns `None` on empty input.
pub fn fuse_global(
    regions: &[RegionEstimate],
    policy: FusionPolicy,
) -> std::result::Result<Option<BeliefVector>, ConfigurationError> {
    if regions.is_empty() {
        return Ok(None);
    }
    let beliefs: Vec<&BeliefVector> = regions.iter().map(|r| &r.belief).collect();
    let weights = vec![1.0 / regions.len() as f64; regions.len()];
    FusionEngine::new()
        .combine(policy, &beliefs, &weights)
        .map(Some)
}

/// Build the swarm's agents from configuration, ids `0..agent_count`.
pub fn build_agents(
    config: &SwarmConfig,
    nominal: &Arc<BeliefVector>,
) -> std::result::Result<Vec<Agent>, ConfigurationError> {
    let estimator = OccupancyEstimator::new(config.l_bar)?;
    let sensor = config.sensor.build();
    (0..config.agent_count)
        .map(|i| {
            let overrides = config.agents.get(i);
            let initial = match overrides.and_then(|o| o.initial_belief.clone()) {
                Some(values) => {
                    BeliefVector::try_from_probabilities(values, "agents.initial_belief")?
                }
                None => BeliefVector::uniform(config.grid_size, config.initial_belief),
            };
            let quality = overrides
                .and_then(|o| o.sensor_quality)
                .unwrap_or(config.default_sensor_quality);
            Ok(Agent::new(
                i as AgentId,
                initial,
                Arc::clone(nominal),
                estimator,
                Arc::clone(&sensor),
            )?
            .with_observation_range(config.observation_range)
            .with_sensor_quality(Some(quality)))
        })
        .collect()
}

/// The synchronous swarm: owns the ground truth, every agent, the topology
/// and the centralizer's history.
#[derive(Debug)]
pub struct HierarchicalAggregator {
    config: SwarmConfig,
    state: AggregatorState,
    grid: GroundTruthGrid,
    agents: Vec<Agent>,
    topology: Option<RegionTopology>,
    stage: FusionStage,
    history: EstimateLog,
    round: u64,
}

/// The pieces of an assigned swarm, for handing over to another runtime.
#[derive(Debug)]
pub struct SwarmParts {
    pub config: SwarmConfig,
    pub grid: GroundTruthGrid,
    pub agents: Vec<Agent>,
    pub topology: RegionTopology,
    pub stage: FusionStage,
    pub history: EstimateLog,
    pub round: u64,
}

impl HierarchicalAggregator {
    /// Validate the configuration and build the agents. No region exists yet.
    pub fn new(config: SwarmConfig) -> Result<Self> {
        config.validate()?;
        let stage = FusionStage::from_config(&config)?;
        let agents = build_agents(&config, stage.nominal())?;
        Ok(Self {
            grid: GroundTruthGrid::new(config.grid_size),
            history: EstimateLog::new(config.round.history_capacity),
            state: AggregatorState::Unpartitioned,
            topology: None,
            round: 0,
            agents,
            stage,
            config,
        })
    }

    /// Slice the grid into the configured number of regions.
    pub fn partition(&mut self) -> Result<()> {
        self.expect_state(&[AggregatorState::Unpartitioned], "unpartitioned")?;
        let topology = RegionTopology::partition(
            self.config.grid_size,
            self.config.region_count,
            self.config.partition.remainder,
        )?;
        self.topology = Some(topology);
        self.state = AggregatorState::Partitioned;
        Ok(())
    }

    /// Assign agents to regions by the current ground-truth mass.
    pub fn assign_agents(&mut self) -> Result<()> {
        self.expect_state(&[AggregatorState::Partitioned], "partitioned")?;
        let topology = self.topology.as_mut().ok_or(BeliefError::InvalidState {
            expected: "partitioned",
            actual: AggregatorState::Unpartitioned.name(),
        })?;
        topology.assign_agents(&mut self.agents, &self.grid)?;
        Ok(())
    }

    /// Apply a batch of events to the ground truth. Allowed between rounds.
    pub fn apply_events(&mut self, events: &[ObservationEvent]) -> Result<()> {
        if self.state == AggregatorState::RoundInProgress {
            return Err(self.invalid_state("between rounds"));
        }
        self.grid.apply(events)
    }

    /// Run one full round at time `now`.
    ///
    /// Agents update on a private copy of the swarm, which is committed only
    /// when the round completes; a failed round leaves every agent, the
    /// history and the state as they were.
    pub fn run_round(&mut self, now: u64) -> Result<RoundResult> {
        self.expect_state(
            &[AggregatorState::Partitioned, AggregatorState::RoundComplete],
            "partitioned",
        )?;
        let Some(topology) = self.topology.as_ref().filter(|t| t.is_assigned()) else {
            return Err(self.invalid_state("assigned"));
        };

        let previous = self.state;
        self.state = AggregatorState::RoundInProgress;
        let round = self.round + 1;
        let snapshot = self.grid.snapshot();

        let mut staged = self.agents.clone();
        let outcomes: Vec<(AgentId, Result<AgentReport>)> = staged
            .par_iter_mut()
            .map(|agent| (agent.id(), agent.observe(&snapshot, now)))
            .collect();

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        for (agent, outcome) in outcomes {
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(round, agent, error = %e, "Agent update failed");
                    failed.push(agent);
                }
            }
        }

        if !failed.is_empty() && self.config.round.missing_agents == MissingAgentPolicy::Stall {
            self.state = previous;
            self.round = round;
            return Err(BeliefError::Stalled {
                round,
                missing: failed,
            });
        }

        let result = match self.stage.fuse(round, now, topology, reports, failed) {
            Ok(result) => result,
            Err(e) => {
                self.state = previous;
                self.round = round;
                return Err(e);
            }
        };

        self.agents = staged;
        self.round = round;
        self.history.push(result.estimate.clone());
        self.state = AggregatorState::RoundComplete;

        info!(
            round,
            participants = result.estimate.participants.len(),
            excluded = result.excluded.len(),
            mean_belief = %format!("{:.4}", result.estimate.belief.mean()),
            histogram = %result.estimate.histogram,
            "Round complete"
        );

        Ok(result)
    }

    /// Hand the assigned swarm over, e.g. to the actor runtime.
    pub fn into_parts(self) -> Result<SwarmParts> {
        let state = self.state;
        let Some(topology) = self.topology.filter(|t| t.is_assigned()) else {
            return Err(BeliefError::InvalidState {
                expected: "assigned",
                actual: state.name(),
            });
        };
        Ok(SwarmParts {
            config: self.config,
            grid: self.grid,
            agents: self.agents,
            topology,
            stage: self.stage,
            history: self.history,
            round: self.round,
        })
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Number of rounds attempted so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn grid(&self) -> &GroundTruthGrid {
        &self.grid
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn topology(&self) -> Option<&RegionTopology> {
        self.topology.as_ref()
    }

    pub fn history(&self) -> &EstimateLog {
        &self.history
    }

    pub fn latest(&self) -> Option<&GlobalEstimate> {
        self.history.latest()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn expect_state(&self, allowed: &[AggregatorState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: &'static str) -> BeliefError {
        BeliefError::InvalidState {
            expected,
            actual: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    fn small_config() -> SwarmConfig {
        SwarmConfig {
            grid_size: 10,
            region_count: 2,
            agent_count: 4,
            observation_range: 0,
            ..SwarmConfig::default()
        }
    }

    fn ready(config: SwarmConfig) -> HierarchicalAggregator {
        let mut swarm = HierarchicalAggregator::new(config).unwrap();
        swarm.partition().unwrap();
        swarm.assign_agents().unwrap();
        swarm
    }

    fn report(agent: AgentId, values: Vec<f64>) -> AgentReport {
        let len = values.len();
        AgentReport {
            agent,
            region: Some(0),
            belief: BeliefVector::new(values),
            occupancy: vec![0.05; len],
            nominal: Arc::new(BeliefVector::uniform(len, 0.5)),
            last_update: 1,
            sensor_quality: 0.7,
        }
    }

    #[test]
    fn test_state_machine_order() {
        let mut swarm = HierarchicalAggregator::new(small_config()).unwrap();
        assert_eq!(swarm.state(), AggregatorState::Unpartitioned);
        assert!(matches!(
            swarm.run_round(1),
            Err(BeliefError::InvalidState { .. })
        ));
        assert!(swarm.assign_agents().is_err());

        swarm.partition().unwrap();
        assert_eq!(swarm.state(), AggregatorState::Partitioned);
        assert!(swarm.partition().is_err());
        // partitioned but nobody assigned yet
        assert!(swarm.run_round(1).is_err());

        swarm.assign_agents().unwrap();
        swarm.run_round(1).unwrap();
        assert_eq!(swarm.state(), AggregatorState::RoundComplete);
        swarm.run_round(2).unwrap();
        assert_eq!(swarm.history().len(), 2);
    }

    #[test]
    fn test_quiet_round_keeps_prior() {
        let mut swarm = ready(small_config());
        let result = swarm.run_round(1).unwrap();
        for value in result.estimate.belief.as_slice() {
            assert!((value - 0.5).abs() < 1e-6);
        }
        assert_eq!(result.estimate.histogram.counts, [0, 0, 10, 0, 0]);
        assert_eq!(result.estimate.participants, vec![1, 3, 0, 2]);
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn test_detection_propagates_to_global() {
        let mut swarm = ready(small_config());
        swarm.apply_events(&[ObservationEvent::new(3, 0.9)]).unwrap();
        let result = swarm.run_round(1).unwrap();

        // region 0 holds agents 1 and 3
        for id in [1, 3] {
            let belief = swarm.agent(id).unwrap().belief();
            assert!((belief[3] - 0.8889).abs() < 1e-4);
            assert_eq!(belief[0], 0.5);
        }
        assert_eq!(swarm.agent(0).unwrap().belief()[3], 0.5);

        let region0 = &result.regions[0];
        assert_eq!(region0.acting_leader, 1);
        assert!(region0.belief[3] > 0.5);
        assert!((result.regions[1].belief[3] - 0.5).abs() < 1e-6);
        assert!(result.estimate.belief[3] > 0.5);
        assert!((result.estimate.belief[8] - 0.5).abs() < 1e-6);
        assert_eq!(swarm.latest().unwrap().round, 1);
    }

    #[test]
    fn test_history_capacity_evicts_oldest() {
        let mut config = small_config();
        config.round.history_capacity = Some(2);
        let mut swarm = ready(config);
        for t in 1..=3 {
            swarm.run_round(t).unwrap();
        }
        let rounds: Vec<u64> = swarm.history().iter().map(|e| e.round).collect();
        assert_eq!(rounds, vec![2, 3]);
        swarm.clear_history();
        assert!(swarm.history().is_empty());
    }

    #[test]
    fn test_invalid_intensity_is_rejected_before_the_round() {
        let mut config = small_config();
        config.sensor.mode = crate::sensor::SensorMode::Chernoff;
        let mut swarm = ready(config);

        assert!(swarm.apply_events(&[ObservationEvent::new(3, -0.2)]).is_err());
        assert!(swarm.apply_events(&[ObservationEvent::new(4, f64::NAN)]).is_err());
        assert_eq!(swarm.grid().global(), vec![0.0; 10]);

        swarm.apply_events(&[ObservationEvent::new(3, 0.9)]).unwrap();
        for t in 1..=3 {
            let result = swarm.run_round(t).unwrap();
            assert!(result.estimate.belief.as_slice().iter().all(|v| v.is_finite()));
        }
        assert_eq!(swarm.history().len(), 3);
    }

    #[test]
    fn test_events_out_of_range() {
        let mut swarm = ready(small_config());
        assert!(matches!(
            swarm.apply_events(&[ObservationEvent::new(10, 0.5)]),
            Err(BeliefError::IndexOutOfRange { index: 10, len: 10 })
        ));
    }

    #[test]
    fn test_fuse_region_skips_silent_region() {
        let topology = RegionTopology::partition(4, 2, Default::default()).unwrap();
        let mut region = topology.regions()[0].clone();
        region.members = vec![5, 6];
        region.leader = Some(5);
        let estimate = fuse_region(
            &region,
            &[report(9, vec![0.5; 4])],
            FusionPolicy::Weighted,
            &OmegaWeightEngine::default(),
            1,
        )
        .unwrap();
        assert!(estimate.is_none());
    }

    #[test]
    fn test_fuse_region_excluded_leader() {
        let topology = RegionTopology::partition(2, 1, Default::default()).unwrap();
        let mut region = topology.regions()[0].clone();
        region.members = vec![1, 4, 7];
        region.leader = Some(1);
        let reports = vec![report(7, vec![0.5, 0.5]), report(4, vec![0.5, 0.5])];
        let estimate = fuse_region(
            &region,
            &reports,
            FusionPolicy::Weighted,
            &OmegaWeightEngine::default(),
            1,
        )
        .unwrap()
        .unwrap();
        assert_eq!(estimate.acting_leader, 4);
        assert_eq!(estimate.members, vec![4, 7]);
        assert!((estimate.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_fold_order() {
        let topology = RegionTopology::partition(1, 1, Default::default()).unwrap();
        let mut region = topology.regions()[0].clone();
        region.members = vec![0, 1, 2];
        region.leader = Some(0);
        let reports = vec![
            report(2, vec![0.8]),
            report(0, vec![0.2]),
            report(1, vec![0.2]),
        ];
        let estimate = fuse_region(
            &region,
            &reports,
            FusionPolicy::LegacyFold { omega: 0.5 },
            &OmegaWeightEngine::default(),
            1,
        )
        .unwrap()
        .unwrap();
        // ((0.2 ⊗ 0.2) ⊗ 0.8) = sqrt(0.2 * 0.8) = 0.4
        assert!((estimate.belief[0] - 0.4).abs() < 1e-6);
        assert!(estimate.weights.is_empty());
    }

    #[test]
    fn test_fuse_global() {
        assert_eq!(fuse_global(&[], FusionPolicy::Weighted).unwrap(), None);
        let estimate = |region, v: f64| RegionEstimate {
            region,
            acting_leader: 0,
            members: vec![0],
            weights: vec![1.0],
            belief: BeliefVector::new(vec![v]),
        };
        let fused = fuse_global(&[estimate(0, 0.25), estimate(1, 1.0)], FusionPolicy::Weighted)
            .unwrap()
            .unwrap();
        assert!((fused[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_participants() {
        let stage = FusionStage::from_config(&small_config()).unwrap();
        let mut topology = RegionTopology::partition(10, 2, Default::default()).unwrap();
        let mut agents = build_agents(&small_config(), stage.nominal()).unwrap();
        topology
            .assign_agents(&mut agents, &GroundTruthGrid::new(10))
            .unwrap();
        let err = stage
            .fuse(4, 4, &topology, Vec::new(), vec![0, 1, 2, 3])
            .unwrap_err();
        assert_eq!(err, BeliefError::NoParticipants { round: 4 });
    }

    #[test]
    fn test_agent_overrides() {
        let mut config = small_config();
        let mut belief = vec![0.5; 10];
        belief[0] = 0.9;
        config.agents = vec![
            AgentConfig::default(),
            AgentConfig {
                sensor_quality: Some(0.95),
                initial_belief: Some(belief),
            },
        ];
        let swarm = HierarchicalAggregator::new(config).unwrap();
        assert_eq!(swarm.agent(0).unwrap().sensor_quality(), 0.7);
        assert_eq!(swarm.agent(1).unwrap().sensor_quality(), 0.95);
        assert_eq!(swarm.agent(1).unwrap().belief()[0], 0.9);
        assert_eq!(swarm.agents().len(), 4);
    }

    #[test]
    fn test_into_parts_requires_assignment() {
        let swarm = HierarchicalAggregator::new(small_config()).unwrap();
        assert!(swarm.into_parts().is_err());
        let parts = ready(small_config()).into_parts().unwrap();
        assert_eq!(parts.agents.len(), 4);
        assert_eq!(parts.topology.regions().len(), 2);
    }
}
