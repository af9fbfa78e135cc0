//! The outcome of an attempted move.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;

/// Result of resolving one agent decision against the map.
///
/// `next_position` is where the agent ends up (its current cell when the
/// move failed) and `value` is the payoff in `[-1, 1]`. A reward is consumed
/// exactly once by the agent that made the decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Cell the agent occupies after the move.
    pub next_position: Coord,
    /// Payoff of the move.
    pub value: f64,
}

impl Reward {
    /// Payoff for reaching food or water.
    pub const GAIN: f64 = 1.0;
    /// Payoff for surviving a hazard.
    pub const HARM: f64 = -1.0;

    /// A neutral (zero) reward at `at`.
    pub const fn neutral(at: Coord) -> Self {
        Self {
            next_position: at,
            value: 0.0,
        }
    }

    /// A resource reward at `at`.
    pub const fn gain(at: Coord) -> Self {
        Self {
            next_position: at,
            value: Self::GAIN,
        }
    }

    /// A hazard reward at `at`.
    pub const fn harm(at: Coord) -> Self {
        Self {
            next_position: at,
            value: Self::HARM,
        }
    }
}
