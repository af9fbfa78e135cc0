//! Shared type definitions for the Hexforage simulation.
//!
//! This crate is the single source of truth for the value types that flow
//! between the map, the agents, and the environment. It has no logic beyond
//! small conversions and predicates.
//!
//! # Modules
//!
//! - [`coord`] -- Offset hex coordinates and grid dimensions
//! - [`enums`] -- Terrain kinds and the five-level knowledge classification
//! - [`ids`] -- Strongly-typed agent identifiers
//! - [`options`] -- [`SimulationOptions`], the tunable run configuration
//! - [`reward`] -- [`Reward`], the one-shot result of an attempted move

pub mod coord;
pub mod enums;
pub mod ids;
pub mod options;
pub mod reward;

// Re-export all public types at crate root for convenience.
pub use coord::{Coord, Dimensions};
pub use enums::{Field, KnowledgeClass};
pub use ids::AgentId;
pub use options::SimulationOptions;
pub use reward::Reward;
