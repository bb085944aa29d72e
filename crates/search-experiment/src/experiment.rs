//! Experiment runner for victim-search runs.
//!
//! Orchestrates the run lifecycle:
//! 1. Build the swarm, partition the grid and assign agents on the empty grid
//! 2. Each round: drop a batch of victims, run one hierarchical round
//! 3. Collect per-round metrics, belief history and the topology report

use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use acton_reactive::prelude::*;
use victim_belief::actors::RoundDriver;
use victim_belief::messages::{InjectObservations, RegisterRoundDriver, RoundComplete, StartRound};
use victim_belief::{
    AsyncSwarmBuilder, BeliefError, GroundTruthGrid, HierarchicalAggregator, RegionTopology,
    RoundResult, SwarmConfig,
};

use crate::results::{ExperimentConfig, ExperimentResult, FailedRound, RegionSummary, RoundMetrics};
use crate::scenario::{ScheduleConfig, VictimSchedule};

/// Which rendition of the swarm executes the rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Runtime {
    /// One actor per agent plus a coordinator
    #[default]
    Actors,
    /// In-process rounds on the aggregator
    Synchronous,
}

impl Runtime {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Actors => "actors",
            Self::Synchronous => "sync",
        }
    }
}

impl FromStr for Runtime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "actors" | "actor" | "async" => Ok(Self::Actors),
            "sync" | "synchronous" => Ok(Self::Synchronous),
            _ => bail!("Unknown runtime: {}. Valid: actors, sync", s),
        }
    }
}

/// Configuration for the experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentRunnerConfig {
    pub swarm: SwarmConfig,
    /// Number of rounds to run
    pub rounds: usize,
    pub schedule: ScheduleConfig,
    pub runtime: Runtime,
    /// Pause between rounds (actor runtime only)
    pub round_interval_ms: u64,
}

impl Default for ExperimentRunnerConfig {
    fn default() -> Self {
        Self {
            swarm: SwarmConfig::default(),
            rounds: 5,
            schedule: ScheduleConfig::default(),
            runtime: Runtime::default(),
            round_interval_ms: 0,
        }
    }
}

/// What a run loop hands back before it is packaged into results.
struct RunOutcome {
    topology: RegionTopology,
    round_metrics: Vec<RoundMetrics>,
    failed_rounds: Vec<FailedRound>,
    belief_history: Vec<Vec<f64>>,
    ground_truth: Vec<f64>,
}

impl RunOutcome {
    fn new(topology: RegionTopology) -> Self {
        Self {
            topology,
            round_metrics: Vec::new(),
            failed_rounds: Vec::new(),
            belief_history: Vec::new(),
            ground_truth: Vec::new(),
        }
    }

    fn record(
        &mut self,
        round: u64,
        result: std::result::Result<RoundResult, BeliefError>,
        victims: usize,
        elapsed: Duration,
    ) {
        match result {
            Ok(result) => {
                let metrics = RoundMetrics::from_round(&result, victims, elapsed.as_millis() as u64);
                debug!(
                    round,
                    victims,
                    duration_ms = metrics.duration_ms,
                    "Round metrics recorded"
                );
                self.belief_history.push(result.estimate.belief.get());
                self.round_metrics.push(metrics);
            }
            Err(e) => {
                warn!(round, error = %e, "Round failed");
                self.failed_rounds.push(FailedRound {
                    round,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// The experiment runner.
pub struct ExperimentRunner {
    config: ExperimentRunnerConfig,
}

impl ExperimentRunner {
    pub fn new(config: ExperimentRunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentRunnerConfig {
        &self.config
    }

    /// Run the configured number of rounds.
    pub async fn run(&self) -> Result<ExperimentResult> {
        let started_at = Utc::now();

        let schedule = VictimSchedule::new(ScheduleConfig {
            grid_size: self.config.swarm.grid_size,
            ..self.config.schedule.clone()
        })?;

        let mut swarm = HierarchicalAggregator::new(self.config.swarm.clone())?;
        swarm.partition()?;
        // assignment sees only the empty grid
        swarm.assign_agents()?;

        info!(
            runtime = self.config.runtime.name(),
            rounds = self.config.rounds,
            grid_size = self.config.swarm.grid_size,
            regions = self.config.swarm.region_count,
            agents = self.config.swarm.agent_count,
            "Starting victim-search run"
        );

        let outcome = match self.config.runtime {
            Runtime::Synchronous => self.run_synchronous(swarm, schedule)?,
            Runtime::Actors => self.run_actors(swarm, schedule).await?,
        };

        let ended_at = Utc::now();
        info!(
            completed = outcome.round_metrics.len(),
            failed = outcome.failed_rounds.len(),
            "Run finished"
        );

        Ok(ExperimentResult {
            config: ExperimentConfig {
                runtime: self.config.runtime.name().to_string(),
                grid_size: self.config.swarm.grid_size,
                region_count: self.config.swarm.region_count,
                agent_count: self.config.swarm.agent_count,
                observation_range: self.config.swarm.observation_range,
                rounds: self.config.rounds,
                victims_per_round: self.config.schedule.victims_per_round,
                seed: self.config.schedule.seed,
            },
            started_at,
            ended_at,
            topology: RegionSummary::from_topology(&outcome.topology),
            round_metrics: outcome.round_metrics,
            failed_rounds: outcome.failed_rounds,
            belief_history: outcome.belief_history,
            ground_truth: outcome.ground_truth,
        })
    }

    fn run_synchronous(
        &self,
        mut swarm: HierarchicalAggregator,
        mut schedule: VictimSchedule,
    ) -> Result<RunOutcome> {
        let topology = match swarm.topology() {
            Some(topology) => topology.clone(),
            None => bail!("swarm has no topology"),
        };
        let mut outcome = RunOutcome::new(topology);

        for round in 1..=self.config.rounds as u64 {
            let events = schedule.next_round();
            swarm.apply_events(&events)?;

            let start = Instant::now();
            let result = swarm.run_round(round);
            outcome.record(round, result, events.len(), start.elapsed());
        }

        outcome.ground_truth = swarm.grid().global();
        Ok(outcome)
    }

    async fn run_actors(
        &self,
        swarm: HierarchicalAggregator,
        mut schedule: VictimSchedule,
    ) -> Result<RunOutcome> {
        let topology = match swarm.topology() {
            Some(topology) => topology.clone(),
            None => bail!("swarm has no topology"),
        };
        let mut outcome = RunOutcome::new(topology);
        // mirror of the coordinator's ground truth for the results file
        let mut ground_truth = GroundTruthGrid::new(self.config.swarm.grid_size);

        let mut runtime = ActonApp::launch_async().await;

        let (round_tx, mut round_rx) = mpsc::channel::<RoundComplete>(64);
        let driver = RoundDriver::new(round_tx).spawn(&mut runtime).await;

        let coordinator = AsyncSwarmBuilder::new(swarm).spawn(&mut runtime).await?;
        coordinator
            .send(RegisterRoundDriver { handle: driver })
            .await;

        for round in 1..=self.config.rounds as u64 {
            let events = schedule.next_round();
            ground_truth.apply(&events)?;
            let victims = events.len();

            let start = Instant::now();
            coordinator.send(InjectObservations { events }).await;
            coordinator.send(StartRound { now: round }).await;

            let Some(completed) = round_rx.recv().await else {
                warn!(round, "RoundComplete channel closed unexpectedly");
                break;
            };
            outcome.record(completed.round, completed.result, victims, start.elapsed());

            if self.config.round_interval_ms > 0 && round < self.config.rounds as u64 {
                tokio::time::sleep(Duration::from_millis(self.config.round_interval_ms)).await;
            }
        }

        let _ = runtime.shutdown_all().await;

        outcome.ground_truth = ground_truth.global();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(runtime: Runtime) -> ExperimentRunnerConfig {
        let mut swarm = SwarmConfig {
            grid_size: 20,
            region_count: 2,
            agent_count: 4,
            ..SwarmConfig::default()
        };
        swarm.round.report_timeout_ms = 200;
        ExperimentRunnerConfig {
            swarm,
            rounds: 3,
            schedule: ScheduleConfig {
                victims_per_round: 4,
                seed: Some(42),
                ..ScheduleConfig::default()
            },
            runtime,
            round_interval_ms: 0,
        }
    }

    #[test]
    fn test_parse_runtime() {
        assert_eq!("sync".parse::<Runtime>().unwrap(), Runtime::Synchronous);
        assert_eq!("Actors".parse::<Runtime>().unwrap(), Runtime::Actors);
        assert!("threads".parse::<Runtime>().is_err());
    }

    #[tokio::test]
    async fn test_synchronous_run() {
        let result = ExperimentRunner::new(small_config(Runtime::Synchronous))
            .run()
            .await
            .unwrap();

        assert_eq!(result.round_metrics.len(), 3);
        assert!(result.failed_rounds.is_empty());
        assert_eq!(result.belief_history.len(), 3);
        assert_eq!(result.topology.len(), 2);
        assert_eq!(result.topology[0].members, vec![1, 3]);
        assert_eq!(result.topology[1].leader, Some(0));
        assert_eq!(result.ground_truth.len(), 20);
        for metrics in &result.round_metrics {
            assert_eq!(metrics.participants, 4);
            assert_eq!(metrics.histogram.total(), 20);
        }
        // some victim fell inside a sensed window
        assert!(result.final_belief().unwrap().iter().any(|&b| b > 0.5));
    }

    #[tokio::test]
    async fn test_actor_run_matches_synchronous_run() {
        let sync = ExperimentRunner::new(small_config(Runtime::Synchronous))
            .run()
            .await
            .unwrap();
        let actors = ExperimentRunner::new(small_config(Runtime::Actors))
            .run()
            .await
            .unwrap();

        assert_eq!(actors.round_metrics.len(), 3);
        assert_eq!(actors.ground_truth, sync.ground_truth);
        for (a, s) in actors
            .final_belief()
            .unwrap()
            .iter()
            .zip(sync.final_belief().unwrap())
        {
            assert!((a - s).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_schedule() {
        let mut config = small_config(Runtime::Synchronous);
        config.schedule.victims_per_round = 50;
        assert!(ExperimentRunner::new(config).run().await.is_err());
    }
}
