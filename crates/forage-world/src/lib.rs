//! Geography and spatial reasoning for the Hexforage simulation.
//!
//! This crate models the physical world the agents forage in: a rectangular
//! hex grid of terrain cells, the belief maps agents keep about it, and the
//! knowledge-conditioned path search that turns beliefs into routes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid access and map loading.
//! - [`hex`] -- Hex coordinate math: neighbours, pixel mapping, straight-line
//!   distance, line sampling and radius-limited flood distribution.
//! - [`knowledge`] -- [`Knowledge`], a belief map of cell values, categories
//!   and recency stamps.
//! - [`map`] -- [`Map`], the terrain grid with bounds-checked access and
//!   [`Map::search_path`].

pub mod error;
pub mod hex;
pub mod knowledge;
pub mod map;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use knowledge::Knowledge;
pub use map::{Map, NEGATIVE_PENALTY, PathPlan, PathTier, RISK_COST_THRESHOLD, STEP_COST};
