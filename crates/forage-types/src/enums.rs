//! Enumeration types shared across the simulation.

use serde::{Deserialize, Serialize};

/// Terrain kind of a single map cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Nothing of interest.
    #[default]
    Empty,
    /// Edible resource; depletes with use.
    Food,
    /// Drinkable resource; depletes with use.
    Water,
    /// Hazard that may kill an agent; wears out with encounters.
    Danger,
    /// Impassable cell.
    Blocked,
    /// The colony's home and spawn point. Exactly one per map.
    Population,
}

impl Field {
    /// Kinds the environment may drop onto the map when it mutates terrain.
    pub const MUTATION_KINDS: [Self; 3] = [Self::Food, Self::Water, Self::Danger];

    /// Parse a map-source character.
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Self::Empty),
            'F' => Some(Self::Food),
            'W' => Some(Self::Water),
            'T' => Some(Self::Danger),
            'X' => Some(Self::Blocked),
            'P' => Some(Self::Population),
            _ => None,
        }
    }

    /// The map-source character for this kind.
    pub const fn symbol(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Food => 'F',
            Self::Water => 'W',
            Self::Danger => 'T',
            Self::Blocked => 'X',
            Self::Population => 'P',
        }
    }

    /// Cells that carry a richness counter and revert to [`Field::Empty`].
    pub const fn is_depletable(self) -> bool {
        matches!(self, Self::Food | Self::Water | Self::Danger)
    }
}

/// What an agent's knowledge says about a cell.
///
/// The numeric [`level`](KnowledgeClass::level) is the five-level code used
/// by pathing diagnostics and presentation (unknown = 0 ... blocked = 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KnowledgeClass {
    /// The cell has never been observed.
    Unknown,
    /// A value is remembered but it is in no category.
    Neutral,
    /// Remembered as harmful.
    Negative,
    /// Remembered as rewarding.
    Positive,
    /// Remembered as impassable.
    Blocked,
}

impl KnowledgeClass {
    /// Numeric classification level.
    pub const fn level(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Neutral => 1,
            Self::Negative => 2,
            Self::Positive => 3,
            Self::Blocked => 4,
        }
    }
}
