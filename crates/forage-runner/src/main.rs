//! Headless batch runner for the Hexforage simulation.
//!
//! Loads a map and an optional options file, runs a batch of seeded
//! simulations and writes the statistics report.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Parse the command line
//! 3. Load the map and the options
//! 4. Run the batch
//! 5. Print and write the report

mod batch;
mod error;

use std::path::PathBuf;

use clap::Parser;
use forage_core::load_options;
use forage_types::SimulationOptions;
use forage_world::Map;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::batch::{BatchPlan, report_path, run_batch, write_report};
use crate::error::RunnerError;

#[derive(Parser)]
#[command(
    name = "forage-runner",
    version,
    about = "Run batches of Hexforage foraging simulations and report their statistics",
    long_about = None
)]
struct Cli {
    /// Map file (one row per line: P home, . empty, F food, W water, T danger, X blocked)
    #[arg(short, long)]
    map: PathBuf,
    /// Options file (`key = value` lines, or YAML for .yaml/.yml)
    #[arg(short, long)]
    options: Option<PathBuf>,
    /// Number of simulations in the batch
    #[arg(short, long, default_value_t = 1)]
    runs: u32,
    /// Step budget of each simulation
    #[arg(short, long, default_value_t = 1_000)]
    steps: u64,
    /// Base seed; run i uses seed + i (overrides the options file)
    #[arg(long)]
    seed: Option<u64>,
    /// Report destination (defaults to <options name>.txt)
    #[arg(long)]
    report: Option<PathBuf>,
    /// Emit the report as JSON instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Application entry point for the batch runner.
///
/// # Errors
///
/// Returns an error if the inputs cannot be loaded, a simulation fails or
/// the report cannot be written.
fn main() -> Result<(), RunnerError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // 2. Parse the command line.
    let cli = Cli::parse();
    info!(map = %cli.map.display(), runs = cli.runs, steps = cli.steps, "forage-runner starting");

    // 3. Load the map and the options.
    let map = Map::from_file(&cli.map)?;
    info!(rows = map.dimensions().rows, cols = map.dimensions().cols, "map loaded");

    let options = match &cli.options {
        Some(path) => {
            let (options, issues) = load_options(path)?;
            if !issues.is_empty() {
                warn!(count = issues.len(), path = %path.display(), "options lines ignored");
            }
            options
        }
        None => {
            info!("no options file, using defaults");
            SimulationOptions::default()
        }
    };

    // 4. Run the batch.
    let report = run_batch(&map, &options, BatchPlan {
        runs: cli.runs,
        max_steps: cli.steps,
        seed: cli.seed,
    })?;

    // 5. Print and write the report.
    let rendered = if cli.json {
        report.to_json()?
    } else {
        report.render()
    };
    println!("{rendered}");
    if let Some(path) = report_path(cli.report.as_deref(), &options) {
        write_report(&path, &rendered)?;
    }

    info!("forage-runner finished");
    Ok(())
}
