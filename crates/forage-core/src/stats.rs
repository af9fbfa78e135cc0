//! Run statistics and the batch report.
//!
//! [`RunStats::run`] drives one simulation up to a step budget and records a
//! [`StepSample`] after every step. [`BatchReport::from_runs`] averages many
//! runs. Its plain-text form has eight lines:
//!
//! 1. average number of steps
//! 2. average fraction of the map discovered
//! 3. average lifetime of an agent that died
//! 4. fraction of runs in which the population survived
//! 5. colony food at the end of each run
//! 6. average population per step
//! 7. average colony food per step
//! 8. average discovered fraction per step

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SimulationError;
use crate::simulation::Simulation;

/// State of a run right after one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSample {
    /// Living agents.
    pub agents: usize,
    /// Food stored at home.
    pub food: u64,
    /// Fraction of the map discovered so far.
    pub discovered: f64,
}

/// Outcome of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Steps executed.
    pub steps: u64,
    /// Fraction of the map discovered.
    pub discovered: f64,
    /// Mean lifetime of the agents that died; `0` when none did.
    pub average_lifetime: f64,
    /// Food stored at home when the run ended.
    pub total_food: u64,
    /// Whether the population was still alive at the step budget.
    pub survived: bool,
    /// One sample per executed step.
    pub samples: Vec<StepSample>,
}

impl RunStats {
    /// Step `sim` until its population dies out or `max_steps` is reached.
    pub fn run(sim: &mut Simulation, max_steps: u64) -> Result<Self, SimulationError> {
        let mut samples = Vec::new();
        while !sim.is_finished() && sim.options().step_counter < max_steps {
            sim.step()?;
            samples.push(StepSample {
                agents: sim.agents_count(),
                food: sim.options().total_food,
                discovered: sim.discovered_fraction(),
            });
        }
        let stats = Self::summarize(sim, samples, max_steps);
        info!(
            steps = stats.steps,
            discovered = stats.discovered,
            average_lifetime = stats.average_lifetime,
            total_food = stats.total_food,
            survived = stats.survived,
            "run finished"
        );
        Ok(stats)
    }

    /// Summarize `sim` as it stands, with the samples collected so far.
    #[allow(clippy::cast_precision_loss)]
    pub fn summarize(sim: &Simulation, samples: Vec<StepSample>, max_steps: u64) -> Self {
        let lifetimes = sim.get_env().get_lifetimes();
        let average_lifetime = if lifetimes.is_empty() {
            0.0
        } else {
            lifetimes.iter().map(|l| *l as f64).sum::<f64>() / lifetimes.len() as f64
        };
        let steps = sim.options().step_counter;
        Self {
            steps,
            discovered: sim.discovered_fraction(),
            average_lifetime,
            total_food: sim.options().total_food,
            survived: steps >= max_steps,
            samples,
        }
    }
}

/// Averages over a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of runs averaged.
    pub runs: usize,
    /// Step budget of each run.
    pub max_steps: u64,
    /// Mean steps executed.
    pub average_steps: f64,
    /// Mean discovered fraction.
    pub discovered: f64,
    /// Mean of the per-run average lifetimes.
    pub average_lifetime: f64,
    /// Fraction of runs that survived.
    pub survival_ratio: f64,
    /// Food at the end of each run.
    pub food_at_end: Vec<u64>,
    /// Mean population per step.
    pub agents_per_step: Vec<f64>,
    /// Mean colony food per step.
    pub food_per_step: Vec<f64>,
    /// Mean discovered fraction per step.
    pub discovery_per_step: Vec<f64>,
}

impl BatchReport {
    /// Average `runs`, each budgeted `max_steps` steps.
    ///
    /// A run that ended early counts zero agents for its missing steps and
    /// carries its last food and discovery values forward.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_runs(runs: &[RunStats], max_steps: u64) -> Self {
        let count = runs.len();
        let divisor = if count == 0 { 1.0 } else { count as f64 };
        let width = usize::try_from(max_steps).unwrap_or(0);

        let mut agents_per_step = vec![0.0; width];
        let mut food_per_step = vec![0.0; width];
        let mut discovery_per_step = vec![0.0; width];

        for run in runs {
            let last = run.samples.last().copied();
            let rows = agents_per_step
                .iter_mut()
                .zip(food_per_step.iter_mut())
                .zip(discovery_per_step.iter_mut());
            for (idx, ((agents, food), discovery)) in rows.enumerate() {
                if let Some(sample) = run.samples.get(idx) {
                    *agents += sample.agents as f64;
                    *food += sample.food as f64;
                    *discovery += sample.discovered;
                } else if let Some(sample) = last {
                    *food += sample.food as f64;
                    *discovery += sample.discovered;
                }
            }
        }

        for value in agents_per_step
            .iter_mut()
            .chain(food_per_step.iter_mut())
            .chain(discovery_per_step.iter_mut())
        {
            *value /= divisor;
        }

        let mean = |f: fn(&RunStats) -> f64| runs.iter().map(f).sum::<f64>() / divisor;

        Self {
            runs: count,
            max_steps,
            average_steps: mean(|r| r.steps as f64),
            discovered: mean(|r| r.discovered),
            average_lifetime: mean(|r| r.average_lifetime),
            survival_ratio: mean(|r| if r.survived { 1.0 } else { 0.0 }),
            food_at_end: runs.iter().map(|r| r.total_food).collect(),
            agents_per_step,
            food_per_step,
            discovery_per_step,
        }
    }

    /// Number of runs that survived.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn survived(&self) -> usize {
        (self.survival_ratio * self.runs as f64).round() as usize
    }

    /// The eight-line plain-text report.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn write_row<T: core::fmt::Display>(
    f: &mut core::fmt::Formatter<'_>,
    values: &[T],
) -> core::fmt::Result {
    let mut first = true;
    for value in values {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{value}")?;
        first = false;
    }
    writeln!(f)
}

impl core::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{}", self.average_steps)?;
        writeln!(f, "{}", self.discovered)?;
        writeln!(f, "{}", self.average_lifetime)?;
        writeln!(f, "{}", self.survival_ratio)?;
        write_row(f, &self.food_at_end)?;
        write_row(f, &self.agents_per_step)?;
        write_row(f, &self.food_per_step)?;
        write_row(f, &self.discovery_per_step)
    }
}
