//! Error types for the batch runner binary.
//!
//! [`RunnerError`] wraps every failure mode between reading the inputs and
//! writing the report, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the batch runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The map file could not be read or parsed.
    #[error("map error: {source}")]
    Map {
        /// The underlying world error.
        #[from]
        source: forage_world::WorldError,
    },

    /// The options file could not be read or parsed.
    #[error("options error: {source}")]
    Options {
        /// The underlying options error.
        #[from]
        source: forage_core::OptionsError,
    },

    /// A simulation failed mid-run.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: forage_core::SimulationError,
    },

    /// The report could not be written.
    #[error("failed to write report to {path}: {source}")]
    Report {
        /// Destination of the report.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("json error: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A batch needs at least one run.
    #[error("the number of runs must be at least 1")]
    NoRuns,
}
