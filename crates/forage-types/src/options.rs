//! Tunable configuration and run-state counters for one simulation run.
//!
//! The sharing probabilities are *cumulative band bounds*: a single uniform
//! draw `u` selects path+place when `u < share_good_path_place`, path when
//! `u < share_good_path`, and so on. Each bound should therefore be at least
//! as large as the one before it.

use serde::{Deserialize, Serialize};

/// Configuration record for a run.
///
/// Built once before the simulation starts; the environment updates the
/// counters (`step_counter`, `total_food`) in place while the run proceeds,
/// and a presentation layer may retune the probabilities between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Minimum value of a Positive cell for it to be chosen as a target.
    pub target_threshold: f64,
    /// Upper band bound for sharing a route together with the place.
    pub share_good_path_place: f64,
    /// Upper band bound for sharing a route only.
    pub share_good_path: f64,
    /// Upper band bound for sharing the exact place.
    pub share_good_place: f64,
    /// Upper band bound for sharing a fuzzy neighbourhood of the place.
    pub share_good_distributed_place: f64,
    /// Upper band bound for sharing the direction toward the place.
    pub share_good_direction: f64,
    /// Upper band bound for sharing a harmful place exactly.
    pub share_bad_place: f64,
    /// Upper band bound for sharing a fuzzy neighbourhood of a harmful place.
    pub share_bad_distributed_place: f64,
    /// Chance that an agent drops a route whose cost crosses the risk bound.
    pub risky_choices: f64,
    /// Chance of surviving a hazard encounter.
    pub survival_chance: f64,
    /// Values above this are Positive.
    pub good_threshold: f64,
    /// Values below this are Negative.
    pub bad_threshold: f64,
    /// Pixel-space distance under which two agents exchange knowledge.
    pub share_radius: f64,
    /// Per-cell chance that an eligible cell is offered to a peer.
    pub share_chance: f64,
    /// Chance to repeat an exchange although nothing new was learned.
    pub repeated_share: f64,
    /// Steps an agent stays locked after an exchange.
    pub learn_time: u32,
    /// Largest flood radius used by distributed-place sharing.
    pub distribute_radius: u32,
    /// Number of agents created with the simulation.
    pub start_agent_count: u32,
    /// Steps between two spawns; `0` disables spawning.
    pub agent_spawn_time: u64,
    /// Seconds between steps when driven by a presentation layer.
    pub step_time: f64,
    /// Steps an agent survives without food or water.
    pub foodless_survival: u32,
    /// Steps between two terrain mutations; `0` disables mutation.
    pub terrain_modify_step: u64,
    /// Richness of a resource or hazard cell on first use.
    pub default_field_value: u32,
    /// Whether the whole population shares one knowledge instance.
    pub common_knowledge: bool,
    /// Seed for the run's random source; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Run name, used to name reports.
    pub name: String,
    /// Steps executed so far.
    pub step_counter: u64,
    /// Units of food stored at home.
    pub total_food: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            target_threshold: 0.9,
            share_good_path_place: 0.1,
            share_good_path: 0.2,
            share_good_place: 0.5,
            share_good_distributed_place: 0.8,
            share_good_direction: 1.0,
            share_bad_place: 0.8,
            share_bad_distributed_place: 1.0,
            risky_choices: 0.5,
            survival_chance: 0.8,
            good_threshold: 0.9,
            bad_threshold: -0.9,
            share_radius: 45.0,
            share_chance: 0.9,
            repeated_share: 0.0,
            learn_time: 15,
            distribute_radius: 2,
            start_agent_count: 3,
            agent_spawn_time: 20,
            step_time: 0.016,
            foodless_survival: 100,
            terrain_modify_step: 25,
            default_field_value: 10,
            common_knowledge: false,
            seed: None,
            name: String::new(),
            step_counter: 0,
            total_food: 0,
        }
    }
}

impl SimulationOptions {
    /// Whether `value` counts as good.
    pub fn is_good(&self, value: f64) -> bool {
        value > self.good_threshold
    }

    /// Whether `value` counts as bad.
    pub fn is_bad(&self, value: f64) -> bool {
        value < self.bad_threshold
    }

    /// Whether a new agent should appear on `step`.
    pub const fn spawn_due(&self, step: u64) -> bool {
        self.agent_spawn_time != 0 && step % self.agent_spawn_time == 0
    }

    /// Whether the terrain should mutate on `step`.
    pub const fn terrain_mutation_due(&self, step: u64) -> bool {
        self.terrain_modify_step != 0 && step % self.terrain_modify_step == 0
    }
}
