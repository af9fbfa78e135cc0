//! Error types for the forage-core crate.
//!
//! Hazard and starvation deaths, failed moves and unreachable targets are
//! ordinary outcomes of a tick, never errors. What remains are broken
//! invariants: off-grid coordinates and agents without knowledge.

use forage_agents::AgentError;
use forage_types::AgentId;
use forage_world::WorldError;

/// Errors that can occur while the environment resolves a step.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// A map access failed.
    #[error("map error: {source}")]
    World {
        /// The underlying map error.
        #[from]
        source: WorldError,
    },

    /// An agent operation failed.
    #[error("agent error for {agent_id}: {source}")]
    Agent {
        /// The agent being processed.
        agent_id: AgentId,
        /// The underlying agent error.
        source: AgentError,
    },
}

/// Errors that can occur while driving a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The environment failed to resolve a step.
    #[error("step {step} failed: {source}")]
    Step {
        /// The step being resolved.
        step: u64,
        /// The underlying environment error.
        source: EnvironmentError,
    },

    /// No living agent has the requested id.
    #[error("no living agent with id {0}")]
    AgentNotFound(AgentId),

    /// The agent's knowledge could not be read.
    #[error(transparent)]
    Agent(#[from] AgentError),
}
