//! Error types for the forage-agents crate.

use forage_types::AgentId;
use forage_world::WorldError;

/// Errors that can occur while an agent plans, learns or shares.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A map query failed (an off-grid target or endpoint).
    #[error(transparent)]
    World(#[from] WorldError),

    /// No knowledge is registered for the agent.
    #[error("no knowledge registered for {0}")]
    KnowledgeMissing(AgentId),

    /// Pairwise exchange was requested while the whole population shares
    /// one knowledge instance.
    #[error("knowledge is common to the population; there is nothing to exchange")]
    CommonKnowledge,
}
