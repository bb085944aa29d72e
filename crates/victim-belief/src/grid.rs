//! Ground-truth observation intensities fed by the external event schedule.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{BeliefError, ConfigurationError, Result};

/// A single (cell, intensity) pair from the event feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationEvent {
    pub index: usize,
    pub intensity: f64,
}

impl ObservationEvent {
    pub fn new(index: usize, intensity: f64) -> Self {
        Self { index, intensity }
    }
}

/// Accumulated observation intensity per cell.
///
/// Only the event feed mutates it. Agents never hold a reference to the live
/// grid: each round they read from a copy taken by [`GroundTruthGrid::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthGrid {
    cells: Vec<f64>,
}

impl GroundTruthGrid {
    /// A grid of `size` cells with no observations.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Add `intensity` to the cell at `index`. Values accumulate and never reset.
    pub fn add_observation(&mut self, index: usize, intensity: f64) -> Result<()> {
        self.check(&ObservationEvent::new(index, intensity))?;
        self.cells[index] += intensity;
        Ok(())
    }

    /// Apply a batch of events. Every event is checked first; a rejected
    /// batch leaves the grid untouched.
    pub fn apply(&mut self, events: &[ObservationEvent]) -> Result<()> {
        for event in events {
            self.check(event)?;
        }
        for event in events {
            self.cells[event.index] += event.intensity;
        }
        Ok(())
    }

    fn check(&self, event: &ObservationEvent) -> Result<()> {
        let len = self.cells.len();
        if event.index >= len {
            return Err(BeliefError::IndexOutOfRange {
                index: event.index,
                len,
            });
        }
        if !event.intensity.is_finite() || event.intensity < 0.0 {
            return Err(ConfigurationError::InvalidMagnitude {
                what: "observation intensity",
                index: event.index,
                value: event.intensity,
            }
            .into());
        }
        Ok(())
    }

    /// Copy of a contiguous range of cells, without normalization.
    pub fn read_range(&self, range: Range<usize>) -> Result<Vec<f64>> {
        let len = self.cells.len();
        if range.end > len {
            return Err(BeliefError::IndexOutOfRange {
                index: range.end - 1,
                len,
            });
        }
        Ok(self.cells.get(range).map(<[f64]>::to_vec).unwrap_or_default())
    }

    /// Copy of an explicit set of cells, in the order given.
    pub fn read_indices(&self, indices: &[usize]) -> Result<Vec<f64>> {
        let len = self.cells.len();
        indices
            .iter()
            .map(|&index| {
                self.cells
                    .get(index)
                    .copied()
                    .ok_or(BeliefError::IndexOutOfRange { index, len })
            })
            .collect()
    }

    /// Copy of the whole grid.
    pub fn global(&self) -> Vec<f64> {
        self.cells.clone()
    }

    /// Total intensity inside `range`, used to rank regions.
    pub fn mass(&self, range: Range<usize>) -> f64 {
        self.cells
            .get(range)
            .map(|cells| cells.iter().sum())
            .unwrap_or(0.0)
    }

    /// Read-only copy handed to agents for one round.
    pub fn snapshot(&self) -> GroundTruthGrid {
        self.clone()
    }
}

impl fmt::Display for GroundTruthGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:.3}", v)?;
        }
        write!(f, "]")
    }
}
