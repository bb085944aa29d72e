//! Region topology: contiguous partitions of the grid, agent assignment and
//! leader election.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{Agent, AgentId};
use crate::error::ConfigurationError;
use crate::grid::GroundTruthGrid;

/// Index of a region in partition order.
pub type RegionId = usize;

/// What happens to the trailing cells when the grid size is not a multiple
/// of the region count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Fail with [`ConfigurationError::IndivisibleGrid`].
    #[default]
    Reject,
    /// Leave the trailing cells uncovered.
    LegacyDrop,
    /// Hand the trailing cells to the last region.
    ExtendLast,
}

/// Partitioning settings.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub remainder: RemainderPolicy,
}

/// One contiguous slice of the grid and the agents assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub id: RegionId,
    pub cells: Range<usize>,
    /// Members in ascending id order.
    pub members: Vec<AgentId>,
    pub leader: Option<AgentId>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Deterministic leader election: the lowest agent id wins.
pub fn elect_leader(members: &[AgentId]) -> Option<AgentId> {
    members.iter().copied().min()
}

/// The partition of the grid into regions and the agent-to-region map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTopology {
    grid_size: usize,
    regions: Vec<Region>,
}

impl RegionTopology {
    /// Slice `[0, grid_size)` into `region_count` equal contiguous regions.
    pub fn partition(
        grid_size: usize,
        region_count: usize,
        policy: RemainderPolicy,
    ) -> Result<Self, ConfigurationError> {
        if grid_size == 0 {
            return Err(ConfigurationError::ZeroGridSize);
        }
        if region_count == 0 {
            return Err(ConfigurationError::ZeroRegions);
        }
        if region_count > grid_size {
            return Err(ConfigurationError::TooManyRegions {
                regions: region_count,
                grid_size,
            });
        }
        let remainder = grid_size % region_count;
        if remainder != 0 && policy == RemainderPolicy::Reject {
            return Err(ConfigurationError::IndivisibleGrid {
                grid_size,
                regions: region_count,
            });
        }

        let size = grid_size / region_count;
        let regions = (0..region_count)
            .map(|id| {
                let start = id * size;
                let mut end = start + size;
                if id + 1 == region_count && policy == RemainderPolicy::ExtendLast {
                    end = grid_size;
                }
                Region {
                    id,
                    cells: start..end,
                    members: Vec::new(),
                    leader: None,
                }
            })
            .collect();

        if remainder != 0 && policy == RemainderPolicy::LegacyDrop {
            warn!(
                grid_size,
                regions = region_count,
                dropped = remainder,
                "Trailing cells left outside every region"
            );
        }
        debug!(grid_size, regions = region_count, size, "Grid partitioned");

        Ok(Self { grid_size, regions })
    }

    /// Assign agents to regions by ground-truth mass.
    ///
    /// Regions are ranked by total intensity, descending, ties broken by
    /// descending region id. Agents, taken in ascending id order, are dealt
    /// round-robin over the ranking, so any remainder lands in the
    /// highest-ranked regions. Each region's leader is its lowest id member.
    pub fn assign_agents(
        &mut self,
        agents: &mut [Agent],
        grid: &GroundTruthGrid,
    ) -> Result<(), ConfigurationError> {
        if grid.len() != self.grid_size {
            return Err(ConfigurationError::LengthMismatch {
                what: "ground truth grid",
                expected: self.grid_size,
                actual: grid.len(),
            });
        }
        let mut seen = HashSet::new();
        for agent in agents.iter() {
            if !seen.insert(agent.id()) {
                return Err(ConfigurationError::DuplicateAgent(agent.id()));
            }
        }

        let mut ranked: Vec<(RegionId, f64)> = self
            .regions
            .iter()
            .map(|r| (r.id, grid.mass(r.cells.clone())))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));

        for region in &mut self.regions {
            region.members.clear();
            region.leader = None;
        }

        let mut order: Vec<usize> = (0..agents.len()).collect();
        order.sort_by_key(|&i| agents[i].id());

        for (slot, &i) in order.iter().enumerate() {
            let (region_id, _) = ranked[slot % ranked.len()];
            let region = &mut self.regions[region_id];
            region.members.push(agents[i].id());
            agents[i].assign_region(region_id, region.cells.clone());
        }

        for region in &mut self.regions {
            region.leader = elect_leader(&region.members);
            match region.leader {
                Some(leader) => debug!(
                    region = region.id,
                    leader,
                    members = ?region.members,
                    "Region leader elected"
                ),
                None => warn!(region = region.id, "Region has no agents and no leader"),
            }
        }
        Ok(())
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn region_of(&self, agent: AgentId) -> Option<RegionId> {
        self.regions
            .iter()
            .find(|r| r.members.contains(&agent))
            .map(|r| r.id)
    }

    pub fn leader_of(&self, region: RegionId) -> Option<AgentId> {
        self.regions.get(region).and_then(|r| r.leader)
    }

    pub fn is_assigned(&self) -> bool {
        self.regions.iter().any(|r| !r.members.is_empty())
    }

    /// Number of cells inside some region.
    pub fn coverage(&self) -> usize {
        self.regions.iter().map(Region::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefVector;
    use crate::occupancy::OccupancyEstimator;
    use crate::sensor::BayesSensor;
    use std::sync::Arc;

    fn agents(ids: &[AgentId], n: usize) -> Vec<Agent> {
        let nominal = Arc::new(BeliefVector::uniform(n, 0.5));
        ids.iter()
            .map(|&id| {
                Agent::new(
                    id,
                    BeliefVector::uniform(n, 0.5),
                    Arc::clone(&nominal),
                    OccupancyEstimator::default(),
                    Arc::new(BayesSensor::default()),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_even_partition() {
        let topology = RegionTopology::partition(10, 2, RemainderPolicy::Reject).unwrap();
        let cells: Vec<_> = topology.regions().iter().map(|r| r.cells.clone()).collect();
        assert_eq!(cells, vec![0..5, 5..10]);
        assert_eq!(topology.coverage(), 10);
    }

    #[test]
    fn test_remainder_policies() {
        assert_eq!(
            RegionTopology::partition(10, 3, RemainderPolicy::Reject).unwrap_err(),
            ConfigurationError::IndivisibleGrid {
                grid_size: 10,
                regions: 3
            }
        );
        let dropped = RegionTopology::partition(10, 3, RemainderPolicy::LegacyDrop).unwrap();
        assert_eq!(dropped.regions()[2].cells, 6..9);
        assert_eq!(dropped.coverage(), 9);
        let extended = RegionTopology::partition(10, 3, RemainderPolicy::ExtendLast).unwrap();
        assert_eq!(extended.regions()[2].cells, 6..10);
        assert_eq!(extended.coverage(), 10);
    }

    #[test]
    fn test_partition_rejects_degenerate_inputs() {
        assert!(RegionTopology::partition(0, 1, RemainderPolicy::Reject).is_err());
        assert!(RegionTopology::partition(5, 0, RemainderPolicy::Reject).is_err());
        assert!(RegionTopology::partition(2, 3, RemainderPolicy::ExtendLast).is_err());
    }

    #[test]
    fn test_assignment_follows_mass_ranking() {
        let mut topology = RegionTopology::partition(9, 3, RemainderPolicy::Reject).unwrap();
        let mut grid = GroundTruthGrid::new(9);
        grid.add_observation(7, 0.9).unwrap();
        grid.add_observation(1, 0.4).unwrap();
        let mut swarm = agents(&[4, 0, 3, 1, 2], 9);

        topology.assign_agents(&mut swarm, &grid).unwrap();

        // ranking: region 2 (0.9), region 0 (0.4), region 1 (0.0)
        assert_eq!(topology.region(2).unwrap().members, vec![0, 3]);
        assert_eq!(topology.region(0).unwrap().members, vec![1, 4]);
        assert_eq!(topology.region(1).unwrap().members, vec![2]);
        assert_eq!(topology.leader_of(2), Some(0));
        assert_eq!(topology.leader_of(0), Some(1));
        assert_eq!(topology.region_of(3), Some(2));
        let agent_four = swarm.iter().find(|a| a.id() == 4).unwrap();
        assert_eq!(agent_four.region(), Some(0));
        assert_eq!(agent_four.observation_window(), 0..3);
    }

    #[test]
    fn test_ties_rank_by_descending_region_id() {
        let mut topology = RegionTopology::partition(10, 2, RemainderPolicy::Reject).unwrap();
        let mut swarm = agents(&[0, 1, 2, 3], 10);
        topology
            .assign_agents(&mut swarm, &GroundTruthGrid::new(10))
            .unwrap();
        // on the empty grid the last region is dealt first
        assert_eq!(topology.region(1).unwrap().members, vec![0, 2]);
        assert_eq!(topology.region(0).unwrap().members, vec![1, 3]);
        assert_eq!(topology.leader_of(0), Some(1));

        let mut topology = RegionTopology::partition(9, 3, RemainderPolicy::Reject).unwrap();
        let mut grid = GroundTruthGrid::new(9);
        grid.add_observation(0, 0.5).unwrap();
        grid.add_observation(4, 0.5).unwrap();
        let mut swarm = agents(&[0, 1, 2], 9);
        topology.assign_agents(&mut swarm, &grid).unwrap();
        // regions 0 and 1 tie on mass: 1 outranks 0
        assert_eq!(topology.region(1).unwrap().members, vec![0]);
        assert_eq!(topology.region(0).unwrap().members, vec![1]);
        assert_eq!(topology.region(2).unwrap().members, vec![2]);
    }

    #[test]
    fn test_region_without_agents_has_no_leader() {
        let mut topology = RegionTopology::partition(6, 3, RemainderPolicy::Reject).unwrap();
        let mut swarm = agents(&[7], 6);
        topology
            .assign_agents(&mut swarm, &GroundTruthGrid::new(6))
            .unwrap();
        assert_eq!(topology.leader_of(2), Some(7));
        assert_eq!(topology.leader_of(0), None);
        assert_eq!(topology.leader_of(1), None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut topology = RegionTopology::partition(4, 2, RemainderPolicy::Reject).unwrap();
        let mut swarm = agents(&[1, 1], 4);
        assert_eq!(
            topology
                .assign_agents(&mut swarm, &GroundTruthGrid::new(4))
                .unwrap_err(),
            ConfigurationError::DuplicateAgent(1)
        );
    }

    #[test]
    fn test_elect_leader() {
        assert_eq!(elect_leader(&[5, 2, 9]), Some(2));
        assert_eq!(elect_leader(&[]), None);
    }
}
