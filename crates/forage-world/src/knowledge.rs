//! An agent's belief about the map.
//!
//! A [`Knowledge`] records, per cell, a belief value in `[-1, 1]`, the step
//! at which that belief was last refreshed, and three classification sets.
//! The positive and negative sets only ever contain cells whose value is
//! known; the blocked set never overlaps them.

use std::collections::{BTreeMap, BTreeSet};

use forage_types::{Coord, KnowledgeClass};

/// Lower bound of a belief value.
pub const MIN_VALUE: f64 = -1.0;
/// Upper bound of a belief value.
pub const MAX_VALUE: f64 = 1.0;

/// Belief values, freshness stamps, and classifications for one owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Knowledge {
    values: BTreeMap<Coord, f64>,
    stamps: BTreeMap<Coord, u64>,
    positive: BTreeSet<Coord>,
    negative: BTreeSet<Coord>,
    blocked: BTreeSet<Coord>,
}

impl Knowledge {
    /// Empty knowledge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Knowledge that already holds a neutral belief about `home`.
    pub fn seeded(home: Coord) -> Self {
        let mut knowledge = Self::new();
        knowledge.remember(home);
        knowledge
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Belief value of a cell, if any.
    pub fn value(&self, coord: Coord) -> Option<f64> {
        self.values.get(&coord).copied()
    }

    /// Belief value of a cell, `0.0` when unknown.
    pub fn value_or_neutral(&self, coord: Coord) -> f64 {
        self.value(coord).unwrap_or(0.0)
    }

    /// Step at which the belief about `coord` was last refreshed, `0` if never.
    pub fn stamp(&self, coord: Coord) -> u64 {
        self.stamps.get(&coord).copied().unwrap_or(0)
    }

    /// Whether a belief value exists for `coord`.
    pub fn is_known(&self, coord: Coord) -> bool {
        self.values.contains_key(&coord)
    }

    /// Whether `coord` is classified positive.
    pub fn is_positive(&self, coord: Coord) -> bool {
        self.positive.contains(&coord)
    }

    /// Whether `coord` is classified negative.
    pub fn is_negative(&self, coord: Coord) -> bool {
        self.negative.contains(&coord)
    }

    /// Whether `coord` is known to be impassable.
    pub fn is_blocked(&self, coord: Coord) -> bool {
        self.blocked.contains(&coord)
    }

    /// Strongest classification of `coord`.
    ///
    /// Blocked beats positive, positive beats negative, negative beats a
    /// merely known value.
    pub fn classify(&self, coord: Coord) -> KnowledgeClass {
        if self.is_blocked(coord) {
            KnowledgeClass::Blocked
        } else if self.is_positive(coord) {
            KnowledgeClass::Positive
        } else if self.is_negative(coord) {
            KnowledgeClass::Negative
        } else if self.is_known(coord) {
            KnowledgeClass::Neutral
        } else {
            KnowledgeClass::Unknown
        }
    }

    /// Cells classified positive, in coordinate order.
    pub fn positive(&self) -> impl Iterator<Item = Coord> + '_ {
        self.positive.iter().copied()
    }

    /// Cells classified negative, in coordinate order.
    pub fn negative(&self) -> impl Iterator<Item = Coord> + '_ {
        self.negative.iter().copied()
    }

    /// Every cell with a belief value and that value.
    pub fn values(&self) -> impl Iterator<Item = (Coord, f64)> + '_ {
        self.values.iter().map(|(c, v)| (*c, *v))
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Ensure `coord` has a value, inserting `0.0` if absent. Returns it.
    pub fn remember(&mut self, coord: Coord) -> f64 {
        *self.values.entry(coord).or_insert(0.0)
    }

    /// Add `delta` to the belief about `coord`, clamped to `[-1, 1]`.
    ///
    /// An unknown cell starts from `0.0`. Returns the new value.
    pub fn accumulate(&mut self, coord: Coord, delta: f64) -> f64 {
        let slot = self.values.entry(coord).or_insert(0.0);
        *slot = (*slot + delta).clamp(MIN_VALUE, MAX_VALUE);
        *slot
    }

    /// Overwrite the belief about `coord`, clamped to `[-1, 1]`.
    pub fn set_value(&mut self, coord: Coord, value: f64) {
        self.values.insert(coord, value.clamp(MIN_VALUE, MAX_VALUE));
    }

    /// Refresh the freshness stamp of `coord`.
    pub fn set_stamp(&mut self, coord: Coord, step: u64) {
        self.stamps.insert(coord, step);
    }

    /// Classify `coord` positive. Returns `true` if it was not already.
    pub fn mark_positive(&mut self, coord: Coord) -> bool {
        self.remember(coord);
        self.positive.insert(coord)
    }

    /// Classify `coord` negative. Returns `true` if it was not already.
    pub fn mark_negative(&mut self, coord: Coord) -> bool {
        self.remember(coord);
        self.negative.insert(coord)
    }

    /// Record `coord` as impassable and drop any value-based belief about it.
    /// Returns `true` if it was not already blocked.
    pub fn mark_blocked(&mut self, coord: Coord) -> bool {
        self.values.remove(&coord);
        self.positive.remove(&coord);
        self.negative.remove(&coord);
        self.blocked.insert(coord)
    }

    /// Remove `coord` from the positive set.
    pub fn unmark_positive(&mut self, coord: Coord) -> bool {
        self.positive.remove(&coord)
    }

    /// Remove `coord` from the negative set.
    pub fn unmark_negative(&mut self, coord: Coord) -> bool {
        self.negative.remove(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_cell_defaults() {
        let k = Knowledge::new();
        let c = Coord::new(1, 1);
        assert_eq!(k.value(c), None);
        assert_eq!(k.stamp(c), 0);
        assert_eq!(k.classify(c), KnowledgeClass::Unknown);
    }

    #[test]
    fn seeded_knows_home() {
        let home = Coord::new(2, 3);
        let k = Knowledge::seeded(home);
        assert!(k.is_known(home));
        assert_eq!(k.classify(home), KnowledgeClass::Neutral);
    }

    #[test]
    fn accumulate_clamps() {
        let mut k = Knowledge::new();
        let c = Coord::new(0, 0);
        assert!((k.accumulate(c, 0.7) - 0.7).abs() < 1e-9);
        assert!((k.accumulate(c, 0.7) - 1.0).abs() < 1e-9);
        assert!((k.accumulate(c, -5.0) - -1.0).abs() < 1e-9);
    }

    #[test]
    fn classification_precedence() {
        let mut k = Knowledge::new();
        let c = Coord::new(0, 0);
        k.mark_negative(c);
        assert_eq!(k.classify(c), KnowledgeClass::Negative);
        k.mark_positive(c);
        assert_eq!(k.classify(c), KnowledgeClass::Positive);
        k.mark_blocked(c);
        assert_eq!(k.classify(c), KnowledgeClass::Blocked);
        assert!(!k.is_known(c));
        assert!(!k.is_positive(c));
    }

    #[test]
    fn marks_report_novelty() {
        let mut k = Knowledge::new();
        let c = Coord::new(4, 4);
        assert!(k.mark_positive(c));
        assert!(!k.mark_positive(c));
        assert!(k.unmark_positive(c));
        assert!(!k.unmark_positive(c));
    }

    #[test]
    fn blocking_keeps_stamp() {
        let mut k = Knowledge::new();
        let c = Coord::new(1, 2);
        k.accumulate(c, 1.0);
        k.mark_positive(c);
        k.set_stamp(c, 9);
        assert!(k.mark_blocked(c));
        assert!(!k.is_known(c));
        assert_eq!(k.positive().count(), 0);
        assert_eq!(k.stamp(c), 9);
    }
}
