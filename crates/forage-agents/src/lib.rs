//! Agents of the Hexforage simulation.
//!
//! This crate holds everything that happens inside a single forager: how it
//! picks a target, plans and follows a route, learns from the reward of each
//! move, starves, and teaches its peers what it knows. It never touches the
//! environment's bookkeeping; the orchestration lives in `forage-core`.
//!
//! # Modules
//!
//! - [`agent`] -- [`Agent`], the decision and reward state machine.
//! - [`bank`] -- [`KnowledgeBank`], per-agent or population-wide knowledge.
//! - [`error`] -- Error types for agent operations ([`AgentError`]).
//! - [`sharing`] -- The pairwise knowledge-sharing protocol.

pub mod agent;
pub mod bank;
pub mod error;
pub mod sharing;

// Re-export primary types at crate root for convenience.
pub use agent::Agent;
pub use bank::KnowledgeBank;
pub use error::AgentError;
pub use sharing::{BadShareMode, GoodShareMode, ShareOutcome, consume_path, consume_place};
