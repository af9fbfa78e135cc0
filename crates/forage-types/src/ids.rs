//! Type-safe identifier wrappers.
//!
//! Agent identifiers are small integers handed out monotonically by the
//! simulation, so an id is never reused within a run and sorts in spawn
//! order.

use serde::{Deserialize, Serialize};

/// Unique identifier for an agent in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    /// The identifier that follows this one.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_spawn() {
        let first = AgentId(0);
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.0, 1);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(AgentId(7).to_string(), "agent-7");
    }
}
