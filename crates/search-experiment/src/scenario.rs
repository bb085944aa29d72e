//! Synthetic victim schedule: each round drops a fixed number of victims on
//! distinct random cells with random intensity.

use anyhow::{Result, bail};
use rand::prelude::*;

use victim_belief::ObservationEvent;

/// Configuration for the victim schedule.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub grid_size: usize,
    /// Distinct cells hit per round
    pub victims_per_round: usize,
    /// Intensities are uniform in `[min_intensity, max_intensity)`
    pub min_intensity: f64,
    pub max_intensity: f64,
    /// Random seed for reproducibility (None for random)
    pub seed: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            grid_size: 100,
            victims_per_round: 10,
            min_intensity: 0.2,
            max_intensity: 0.9,
            seed: None,
        }
    }
}

/// Seeded generator of per-round observation batches.
pub struct VictimSchedule {
    config: ScheduleConfig,
    rng: StdRng,
}

impl VictimSchedule {
    pub fn new(config: ScheduleConfig) -> Result<Self> {
        if config.victims_per_round > config.grid_size {
            bail!(
                "cannot place {} victims on {} cells",
                config.victims_per_round,
                config.grid_size
            );
        }
        if !(config.min_intensity >= 0.0 && config.min_intensity < config.max_intensity) {
            bail!(
                "invalid intensity range [{}, {})",
                config.min_intensity,
                config.max_intensity
            );
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Events for the next round, sorted by cell.
    pub fn next_round(&mut self) -> Vec<ObservationEvent> {
        let cells = rand::seq::index::sample(
            &mut self.rng,
            self.config.grid_size,
            self.config.victims_per_round,
        );
        let mut events: Vec<ObservationEvent> = cells
            .into_iter()
            .map(|index| {
                let intensity = self
                    .rng
                    .random_range(self.config.min_intensity..self.config.max_intensity);
                ObservationEvent::new(index, intensity)
            })
            .collect();
        events.sort_by_key(|e| e.index);
        events
    }
}
