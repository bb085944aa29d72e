//! Agents: owners of one belief vector, updated from their observation window.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::belief::BeliefVector;
use crate::divergence::hellinger;
use crate::error::{BeliefError, ConfigurationError, Result};
use crate::fusion::FusionEngine;
use crate::grid::GroundTruthGrid;
use crate::occupancy::OccupancyEstimator;
use crate::sensor::SensorModel;
use crate::topology::RegionId;

/// Stable agent identifier. Lower ids win leader elections.
pub type AgentId = u32;

/// Sensor quality used when an agent has none configured.
pub const DEFAULT_SENSOR_QUALITY: f64 = 0.7;

/// Copy of an agent's state after an update, as seen by its region leader.
///
/// Carries everything the omega weighting needs so leaders never touch the
/// agent itself.
#[derive(Debug, Clone)]
pub struct AgentReport {
    pub agent: AgentId,
    pub region: Option<RegionId>,
    pub belief: BeliefVector,
    pub occupancy: Vec<f64>,
    pub nominal: Arc<BeliefVector>,
    pub last_update: u64,
    pub sensor_quality: f64,
}

/// A swarm member.
///
/// Holds its belief exclusively and the nominal reference by shared pointer.
/// Only [`Agent::observe`] and [`Agent::communicate_and_fuse`] mutate it.
#[derive(Clone)]
pub struct Agent {
    id: AgentId,
    belief: BeliefVector,
    nominal: Arc<BeliefVector>,
    region: Option<(RegionId, Range<usize>)>,
    observation_range: usize,
    sensor_quality: f64,
    last_update: u64,
    occupancy: Vec<f64>,
    estimator: OccupancyEstimator,
    sensor: Arc<dyn SensorModel>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("cells", &self.belief.len())
            .field("sensor", &self.sensor.name())
            .field("last_update", &self.last_update)
            .finish()
    }
}

impl Agent {
    /// Create an agent whose belief must match the nominal reference in length.
    pub fn new(
        id: AgentId,
        initial_belief: BeliefVector,
        nominal: Arc<BeliefVector>,
        estimator: OccupancyEstimator,
        sensor: Arc<dyn SensorModel>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let occupancy = estimator.estimate(&initial_belief, &nominal)?;
        Ok(Self {
            id,
            belief: initial_belief,
            nominal,
            region: None,
            observation_range: 0,
            sensor_quality: DEFAULT_SENSOR_QUALITY,
            last_update: 0,
            occupancy,
            estimator,
            sensor,
        })
    }

    pub fn with_observation_range(mut self, range: usize) -> Self {
        self.observation_range = range;
        self
    }

    /// Static sensor quality; `None` keeps [`DEFAULT_SENSOR_QUALITY`].
    pub fn with_sensor_quality(mut self, quality: Option<f64>) -> Self {
        self.sensor_quality = quality.unwrap_or(DEFAULT_SENSOR_QUALITY);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Copy of the current belief.
    pub fn belief(&self) -> BeliefVector {
        self.belief.clone()
    }

    /// Copy of the cached occupancy.
    pub fn occupancy(&self) -> Vec<f64> {
        self.occupancy.clone()
    }

    pub fn region(&self) -> Option<RegionId> {
        self.region.as_ref().map(|(id, _)| *id)
    }

    pub fn sensor_quality(&self) -> f64 {
        self.sensor_quality
    }

    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    pub(crate) fn assign_region(&mut self, region: RegionId, cells: Range<usize>) {
        self.region = Some((region, cells));
    }

    /// Cells this agent observes: its region widened by the observation range
    /// on both sides, clipped to the grid. Empty when unassigned.
    pub fn observation_window(&self) -> Range<usize> {
        let Some((_, cells)) = &self.region else {
            return 0..0;
        };
        let len = self.belief.len();
        let start = cells.start.saturating_sub(self.observation_range).min(len);
        let end = cells
            .end
            .saturating_add(self.observation_range)
            .min(len)
            .max(start);
        start..end
    }

    /// Run the sensor model over the observation window of `snapshot`.
    ///
    /// In-window cells become posteriors, out-of-window cells keep their
    /// prior. On failure the belief is left exactly as it was.
    pub fn observe(&mut self, snapshot: &GroundTruthGrid, now: u64) -> Result<AgentReport> {
        if snapshot.len() != self.belief.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "ground truth snapshot",
                expected: self.belief.len(),
                actual: snapshot.len(),
            }
            .into());
        }
        let window = self.observation_window();
        let observation = snapshot.read_range(window.clone())?;

        let mut updated = self.belief.get();
        let mut changed = 0usize;
        for (i, z) in window.clone().zip(observation) {
            let posterior = self
                .sensor
                .posterior(updated[i], z)
                .map_err(|e| BeliefError::Sensor {
                    agent: self.id,
                    reason: e.to_string(),
                })?;
            if let Some(p) = posterior {
                updated[i] = p;
                changed += 1;
            }
        }

        self.belief.update(updated);
        self.last_update = now;
        self.occupancy = self.estimator.estimate(&self.belief, &self.nominal)?;

        trace!(
            agent = self.id,
            window = ?window,
            changed,
            "Agent updated belief"
        );

        Ok(self.report())
    }

    /// Fuse a peer's belief copy into this agent's belief at weight `omega`
    /// (this agent's share).
    pub fn communicate_and_fuse(&mut self, other: &BeliefVector, omega: f64) -> Result<()> {
        let fused = FusionEngine::new().chernoff_pair(&self.belief, other, omega)?;
        self.occupancy = self.estimator.estimate(&fused, &self.nominal)?;
        self.belief = fused;
        Ok(())
    }

    /// Hellinger distance of the belief to the nominal reference.
    pub fn distance_to_reference(&self) -> Result<f64> {
        Ok(hellinger(self.belief.as_slice(), self.nominal.as_slice())?)
    }

    pub fn report(&self) -> AgentReport {
        AgentReport {
            agent: self.id,
            region: self.region(),
            belief: self.belief.clone(),
            occupancy: self.occupancy.clone(),
            nominal: Arc::clone(&self.nominal),
            last_update: self.last_update,
            sensor_quality: self.sensor_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::BayesSensor;

    fn agent(id: AgentId, n: usize) -> Agent {
        Agent::new(
            id,
            BeliefVector::uniform(n, 0.5),
            Arc::new(BeliefVector::uniform(n, 0.5)),
            OccupancyEstimator::default(),
            Arc::new(BayesSensor::default()),
        )
        .unwrap()
    }

    struct BrokenSensor;

    impl SensorModel for BrokenSensor {
        fn name(&self) -> &str {
            "broken"
        }

        fn posterior(&self, _prior: f64, _intensity: f64) -> anyhow::Result<Option<f64>> {
            anyhow::bail!("lens cracked")
        }
    }

    #[test]
    fn test_window_is_clipped() {
        let mut a = agent(0, 10).with_observation_range(2);
        a.assign_region(0, 0..5);
        assert_eq!(a.observation_window(), 0..7);
        a.assign_region(1, 5..10);
        assert_eq!(a.observation_window(), 3..10);
    }

    #[test]
    fn test_unassigned_agent_observes_nothing() {
        let a = agent(0, 4);
        assert_eq!(a.observation_window(), 0..0);
    }

    #[test]
    fn test_observe_only_touches_window() {
        let mut a = agent(0, 10);
        a.assign_region(0, 0..5);
        let mut grid = GroundTruthGrid::new(10);
        grid.add_observation(3, 0.9).unwrap();
        grid.add_observation(7, 0.9).unwrap();

        let report = a.observe(&grid, 1).unwrap();
        assert!((report.belief[3] - 0.8889).abs() < 1e-4);
        assert_eq!(report.belief[7], 0.5);
        assert_eq!(report.belief[0], 0.5);
        assert_eq!(a.last_update(), 1);
        assert!(a.occupancy()[3] > a.occupancy()[0]);
    }

    #[test]
    fn test_failed_update_keeps_prior() {
        let mut a = Agent::new(
            4,
            BeliefVector::uniform(3, 0.5),
            Arc::new(BeliefVector::uniform(3, 0.5)),
            OccupancyEstimator::default(),
            Arc::new(BrokenSensor),
        )
        .unwrap();
        a.assign_region(0, 0..3);
        let err = a.observe(&GroundTruthGrid::new(3), 2).unwrap_err();
        assert!(matches!(err, BeliefError::Sensor { agent: 4, .. }));
        assert_eq!(a.belief(), BeliefVector::uniform(3, 0.5));
        assert_eq!(a.last_update(), 0);
    }

    #[test]
    fn test_snapshot_length_mismatch() {
        let mut a = agent(0, 4);
        assert!(a.observe(&GroundTruthGrid::new(5), 1).is_err());
    }

    #[test]
    fn test_communicate_and_fuse() {
        let mut a = agent(0, 2);
        a.communicate_and_fuse(&BeliefVector::new(vec![0.125, 0.5]), 0.5)
            .unwrap();
        assert!((a.belief()[0] - 0.25).abs() < 1e-6);
        assert!((a.belief()[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_reference_and_default_quality() {
        let a = agent(0, 4).with_sensor_quality(None);
        assert_eq!(a.sensor_quality(), DEFAULT_SENSOR_QUALITY);
        assert_eq!(a.distance_to_reference().unwrap(), 0.0);
        let b = agent(1, 4).with_sensor_quality(Some(0.9));
        assert_eq!(b.sensor_quality(), 0.9);
    }
}
