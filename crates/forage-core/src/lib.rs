//! Environment orchestration and simulation lifecycle for Hexforage.
//!
//! This crate drives the foraging simulation one tick at a time. The
//! [`Environment`] resolves every agent's move against the map, runs the
//! pairwise knowledge exchange, depletes resources and mutates terrain; the
//! [`Simulation`] owns the population, the map and the random source, and
//! exposes read-only state to presentation and batch collaborators.
//!
//! # Modules
//!
//! - [`config`] -- Options files (`key = value` or YAML) into
//!   [`SimulationOptions`](forage_types::SimulationOptions).
//! - [`environment`] -- Per-step orchestration ([`Environment`]).
//! - [`error`] -- Error types for stepping a simulation.
//! - [`simulation`] -- Population, spawning and time ([`Simulation`]).
//! - [`stats`] -- Per-run statistics and the batch report.

pub mod config;
pub mod environment;
pub mod error;
pub mod simulation;
pub mod stats;

// Re-export primary types at crate root.
pub use config::{OptionsError, OptionsIssue, load_options, parse_options};
pub use environment::{Environment, StepSummary};
pub use error::{EnvironmentError, SimulationError};
pub use simulation::Simulation;
pub use stats::{BatchReport, RunStats, StepSample};
