//! Batch execution: many independent simulations over one map and one set
//! of options, averaged into a [`BatchReport`].

use std::path::{Path, PathBuf};

use forage_core::{BatchReport, RunStats, Simulation};
use forage_types::SimulationOptions;
use forage_world::Map;
use tracing::info;

use crate::error::RunnerError;

/// How a batch is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Number of simulations.
    pub runs: u32,
    /// Step budget per simulation.
    pub max_steps: u64,
    /// Base seed; run `i` is seeded with `seed + i`. `None` falls back to the
    /// options' seed, then to the OS.
    pub seed: Option<u64>,
}

/// Run every simulation of `plan` on a fresh copy of `map`.
pub fn run_batch(
    map: &Map,
    options: &SimulationOptions,
    plan: BatchPlan,
) -> Result<BatchReport, RunnerError> {
    if plan.runs == 0 {
        return Err(RunnerError::NoRuns);
    }

    let base = plan.seed.or(options.seed);
    let mut runs = Vec::with_capacity(usize::try_from(plan.runs).unwrap_or(0));
    for index in 0..plan.runs {
        let mut run_options = options.clone();
        run_options.seed = base.map(|seed| seed.wrapping_add(u64::from(index)));
        let mut sim = Simulation::new(map.clone(), run_options);
        let stats = RunStats::run(&mut sim, plan.max_steps)?;
        info!(run = index, steps = stats.steps, survived = stats.survived, "run complete");
        runs.push(stats);
    }

    let report = BatchReport::from_runs(&runs, plan.max_steps);
    info!(
        runs = report.runs,
        survived = report.survived(),
        average_steps = report.average_steps,
        "batch complete"
    );
    Ok(report)
}

/// Where the report goes: the explicit path, or `<name>.txt` for a named
/// run. `None` when neither is available.
pub fn report_path(explicit: Option<&Path>, options: &SimulationOptions) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        let name = options.name.trim();
        (!name.is_empty()).then(|| PathBuf::from(format!("{name}.txt")))
    })
}

/// Write `contents` to `path`.
pub fn write_report(path: &Path, contents: &str) -> Result<(), RunnerError> {
    std::fs::write(path, contents).map_err(|source| RunnerError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "report written");
    Ok(())
}
