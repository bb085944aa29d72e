//! Victim-search experiment CLI.
//!
//! Commands:
//! - run: Run the swarm for a number of rounds against a random victim schedule
//! - topology: Partition and assign on the empty grid, then print the regions

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use search_experiment::experiment::{ExperimentRunner, ExperimentRunnerConfig, Runtime};
use search_experiment::results::{ExperimentResult, RegionSummary};
use search_experiment::scenario::ScheduleConfig;
use victim_belief::{HierarchicalAggregator, SwarmConfig};

/// Cells per printed row of the belief grid.
const GRID_COLUMNS: usize = 10;

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "search-experiment")]
#[command(version)]
#[command(about = "Hierarchical belief fusion for a victim-search swarm")]
struct Cli {
    /// Swarm configuration file (.toml or .json)
    #[arg(long, env = "SWARM_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the swarm
    Run {
        /// Number of rounds
        #[arg(long, default_value = "5")]
        rounds: usize,

        /// Victims dropped per round
        #[arg(long, default_value = "10")]
        victims: usize,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Runtime: actors or sync
        #[arg(long, default_value = "actors")]
        runtime: String,

        /// Pause between rounds in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Output file for results
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the region topology for the configured swarm
    Topology,
}

fn load_swarm_config(path: Option<&Path>) -> Result<SwarmConfig> {
    let config = match path {
        Some(path) => SwarmConfig::from_path(path)?,
        None => SwarmConfig::default(),
    };
    Ok(config)
}

fn print_topology(topology: &[RegionSummary]) {
    println!("\nRegion topology");
    println!("{:>6}  {:>9}  {:>6}  members", "region", "cells", "leader");
    for region in topology {
        let leader = region
            .leader
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:>4}..{:<3}  {:>6}  {:?}",
            region.region, region.cells.0, region.cells.1, leader, region.members
        );
    }
}

fn print_result(result: &ExperimentResult) {
    print_topology(&result.topology);

    println!("\nPer-round histograms");
    for m in &result.round_metrics {
        println!(
            "  round {:>3}: {}  (participants {}, mean {:.3}, max {:.3})",
            m.round, m.histogram, m.participants, m.mean_belief, m.max_belief
        );
    }
    for failed in &result.failed_rounds {
        println!("  round {:>3}: failed: {}", failed.round, failed.error);
    }

    if let Some(belief) = result.final_belief() {
        println!("\nFinal global belief");
        for row in belief.chunks(GRID_COLUMNS) {
            let cells: Vec<String> = row.iter().map(|v| format!("{:.3}", v)).collect();
            println!("  {}", cells.join(" "));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let swarm = load_swarm_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            rounds,
            victims,
            seed,
            runtime,
            interval_ms,
            output,
        } => {
            let runtime: Runtime = runtime.parse()?;
            let config = ExperimentRunnerConfig {
                schedule: ScheduleConfig {
                    grid_size: swarm.grid_size,
                    victims_per_round: victims,
                    seed,
                    ..ScheduleConfig::default()
                },
                swarm,
                rounds,
                runtime,
                round_interval_ms: interval_ms,
            };

            let result = ExperimentRunner::new(config).run().await?;
            print_result(&result);

            if let Some(output) = output {
                let path = timestamped_path(&output);
                result.save(&path)?;
                info!(path = %path.display(), "Results saved");
            }
        }

        Commands::Topology => {
            let mut aggregator = HierarchicalAggregator::new(swarm)?;
            aggregator.partition()?;
            aggregator.assign_agents()?;
            if let Some(topology) = aggregator.topology() {
                print_topology(&RegionSummary::from_topology(topology));
            }
        }
    }

    Ok(())
}
