//! The pairwise knowledge-sharing protocol.
//!
//! When two agents meet, the sharer picks the cells worth telling about: its
//! positive and negative cells that are still beyond threshold, that the
//! peer classifies differently, and about which the peer's information is
//! older. Each candidate also survives an independent `share_chance` roll.
//!
//! One uniform draw then selects how the good news travels, by comparing it
//! against the cumulative bands of [`SimulationOptions`]:
//!
//! | draw below                      | mode                            |
//! |---------------------------------|---------------------------------|
//! | `share_good_path_place`         | [`GoodShareMode::PathAndPlace`] |
//! | `share_good_path`               | [`GoodShareMode::Path`]         |
//! | `share_good_place`              | [`GoodShareMode::Place`]        |
//! | `share_good_distributed_place`  | [`GoodShareMode::DistributedPlace`] |
//! | `share_good_direction`          | [`GoodShareMode::Direction`]    |
//!
//! A second draw selects how the bad news travels ([`BadShareMode`]).

use forage_types::{Coord, SimulationOptions};
use forage_world::{Knowledge, Map, hex};
use rand::Rng;
use tracing::debug;

use crate::agent::Agent;
use crate::error::AgentError;

/// How positive cells are disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodShareMode {
    /// The sharer's route to the cell, then the cell's value.
    PathAndPlace,
    /// Only the sharer's route to the cell.
    Path,
    /// The exact cell and its value.
    Place,
    /// A random-radius blur of the cell, each blurred cell carrying a tenth
    /// of the value.
    DistributedPlace,
    /// The straight line from the sharer toward the cell.
    Direction,
}

impl GoodShareMode {
    /// Mode selected by `draw` in `[0, 1)`; `None` past the last band.
    pub fn select(draw: f64, options: &SimulationOptions) -> Option<Self> {
        if draw < options.share_good_path_place {
            Some(Self::PathAndPlace)
        } else if draw < options.share_good_path {
            Some(Self::Path)
        } else if draw < options.share_good_place {
            Some(Self::Place)
        } else if draw < options.share_good_distributed_place {
            Some(Self::DistributedPlace)
        } else if draw < options.share_good_direction {
            Some(Self::Direction)
        } else {
            None
        }
    }
}

/// How negative cells are disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadShareMode {
    /// The exact cell and its value.
    Place,
    /// A random-radius blur of the cell.
    DistributedPlace,
}

impl BadShareMode {
    /// Mode selected by `draw` in `[0, 1)`; `None` past the last band.
    pub fn select(draw: f64, options: &SimulationOptions) -> Option<Self> {
        if draw < options.share_bad_place {
            Some(Self::Place)
        } else if draw < options.share_bad_distributed_place {
            Some(Self::DistributedPlace)
        } else {
            None
        }
    }
}

/// What one exchange transferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOutcome {
    /// Mode used for positive cells.
    pub good_mode: Option<GoodShareMode>,
    /// Mode used for negative cells.
    pub bad_mode: Option<BadShareMode>,
    /// Positive cells that passed the eligibility filter.
    pub positive: Vec<Coord>,
    /// Negative cells that passed the eligibility filter.
    pub negative: Vec<Coord>,
}

impl ShareOutcome {
    /// Whether nothing was eligible for disclosure.
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}

/// Merge a disclosed place into `knowledge`.
///
/// The incoming value is added to the existing belief (clamped). If the
/// result is beyond a threshold, the cell moves into that category, leaves
/// the opposite one, and takes `stamp`.
pub fn consume_place(
    knowledge: &mut Knowledge,
    place: Coord,
    value: f64,
    stamp: u64,
    options: &SimulationOptions,
) {
    let merged = knowledge.accumulate(place, value);
    if options.is_good(merged) {
        knowledge.mark_positive(place);
        knowledge.unmark_negative(place);
        knowledge.set_stamp(place, stamp);
    } else if options.is_bad(merged) {
        knowledge.mark_negative(place);
        knowledge.unmark_positive(place);
        knowledge.set_stamp(place, stamp);
    }
}

/// Merge a disclosed corridor into `knowledge`: every cell becomes known
/// (values are left as they are) and takes its stamp.
pub fn consume_path(knowledge: &mut Knowledge, cells: impl IntoIterator<Item = (Coord, u64)>) {
    for (cell, stamp) in cells {
        knowledge.remember(cell);
        knowledge.set_stamp(cell, stamp);
    }
}

impl Agent {
    /// Tell a peer what this agent knows.
    ///
    /// `own` is this agent's knowledge, `peer` the receiver's.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if a route to a shared cell cannot be
    /// planned because an endpoint is off the map.
    pub fn share_knowledge(
        &self,
        own: &Knowledge,
        peer: &mut Knowledge,
        map: &Map,
        options: &SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<ShareOutcome, AgentError> {
        let positive: Vec<Coord> = own
            .positive()
            .filter(|p| {
                own.value(*p).is_some_and(|v| options.is_good(v))
                    && is_news(own, peer, *p)
                    && rng.random::<f64>() < options.share_chance
            })
            .collect();
        let negative: Vec<Coord> = own
            .negative()
            .filter(|p| {
                own.value(*p).is_some_and(|v| options.is_bad(v))
                    && is_news(own, peer, *p)
                    && rng.random::<f64>() < options.share_chance
            })
            .collect();

        let good_mode = GoodShareMode::select(rng.random::<f64>(), options);
        if let Some(mode) = good_mode {
            for place in &positive {
                self.disclose_good(mode, *place, own, peer, map, options, rng)?;
            }
        }

        let bad_mode = BadShareMode::select(rng.random::<f64>(), options);
        if let Some(mode) = bad_mode {
            for place in &negative {
                let value = own.value_or_neutral(*place);
                let stamp = own.stamp(*place);
                match mode {
                    BadShareMode::Place => consume_place(peer, *place, value, stamp, options),
                    BadShareMode::DistributedPlace => {
                        disclose_blurred(*place, value, stamp, peer, map, options, rng);
                    }
                }
            }
        }

        debug!(
            agent = %self.id(),
            positive = positive.len(),
            negative = negative.len(),
            ?good_mode,
            ?bad_mode,
            "knowledge shared"
        );

        Ok(ShareOutcome {
            good_mode,
            bad_mode,
            positive,
            negative,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn disclose_good(
        &self,
        mode: GoodShareMode,
        place: Coord,
        own: &Knowledge,
        peer: &mut Knowledge,
        map: &Map,
        options: &SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<(), AgentError> {
        let value = own.value_or_neutral(place);
        let stamp = own.stamp(place);
        match mode {
            GoodShareMode::PathAndPlace => {
                let route = map.search_path(self.get_position(), place, own)?;
                consume_path(peer, route.path.iter().map(|c| (*c, own.stamp(*c))));
                consume_place(peer, place, value, stamp, options);
            }
            GoodShareMode::Path => {
                let route = map.search_path(self.get_position(), place, own)?;
                consume_path(peer, route.path.iter().map(|c| (*c, own.stamp(*c))));
            }
            GoodShareMode::Place => consume_place(peer, place, value, stamp, options),
            GoodShareMode::DistributedPlace => {
                disclose_blurred(place, value, stamp, peer, map, options, rng);
            }
            GoodShareMode::Direction => {
                let line = hex::line_between(self.get_position(), place);
                consume_path(
                    peer,
                    line.into_iter()
                        .filter(|c| map.in_bounds(*c))
                        .map(|c| (c, stamp)),
                );
            }
        }
        Ok(())
    }
}

/// Whether the peer would learn something about `place`: it classifies the
/// cell differently and its information is older.
fn is_news(own: &Knowledge, peer: &Knowledge, place: Coord) -> bool {
    peer.classify(place) != own.classify(place) && peer.stamp(place) < own.stamp(place)
}

fn disclose_blurred(
    place: Coord,
    value: f64,
    stamp: u64,
    peer: &mut Knowledge,
    map: &Map,
    options: &SimulationOptions,
    rng: &mut impl Rng,
) {
    let radius = rng.random_range(1..=options.distribute_radius.max(1));
    for (cell, share) in hex::distribute_point(place, radius, value) {
        if map.in_bounds(cell) {
            consume_place(peer, cell, share, stamp, options);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forage_types::{AgentId, KnowledgeClass};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const FOOD: Coord = Coord::new(0, 3);

    fn options_with_good_band(mode: GoodShareMode) -> SimulationOptions {
        let mut opts = SimulationOptions {
            share_chance: 1.0,
            share_good_path_place: 0.0,
            share_good_path: 0.0,
            share_good_place: 0.0,
            share_good_distributed_place: 0.0,
            share_good_direction: 0.0,
            share_bad_place: 1.0,
            share_bad_distributed_place: 1.0,
            distribute_radius: 1,
            ..SimulationOptions::default()
        };
        match mode {
            GoodShareMode::PathAndPlace => opts.share_good_path_place = 1.0,
            GoodShareMode::Path => opts.share_good_path = 1.0,
            GoodShareMode::Place => opts.share_good_place = 1.0,
            GoodShareMode::DistributedPlace => opts.share_good_distributed_place = 1.0,
            GoodShareMode::Direction => opts.share_good_direction = 1.0,
        }
        opts
    }

    /// A sharer at home on `P....` that knows the row and found food at
    /// (0, 3) on step 5.
    fn scene() -> (Map, Agent, Knowledge, Knowledge) {
        let map = Map::load("P....").unwrap();
        let mut own = Knowledge::new();
        let sharer = Agent::new(AgentId(0), map.start(), &mut own);
        for col in 1..5 {
            let c = Coord::new(0, col);
            own.remember(c);
            own.set_stamp(c, 4);
        }
        own.accumulate(FOOD, 1.0);
        own.mark_positive(FOOD);
        own.set_stamp(FOOD, 5);
        let peer = Knowledge::seeded(map.start());
        (map, sharer, own, peer)
    }

    #[test]
    fn bands_select_in_order() {
        let opts = SimulationOptions::default();
        assert_eq!(GoodShareMode::select(0.05, &opts), Some(GoodShareMode::PathAndPlace));
        assert_eq!(GoodShareMode::select(0.15, &opts), Some(GoodShareMode::Path));
        assert_eq!(GoodShareMode::select(0.3, &opts), Some(GoodShareMode::Place));
        assert_eq!(GoodShareMode::select(0.6, &opts), Some(GoodShareMode::DistributedPlace));
        assert_eq!(GoodShareMode::select(0.95, &opts), Some(GoodShareMode::Direction));
        assert_eq!(BadShareMode::select(0.5, &opts), Some(BadShareMode::Place));
        assert_eq!(BadShareMode::select(0.9, &opts), Some(BadShareMode::DistributedPlace));

        let narrow = SimulationOptions {
            share_good_direction: 0.5,
            ..SimulationOptions::default()
        };
        assert_eq!(GoodShareMode::select(0.9, &narrow), None);
    }

    #[test]
    fn consume_place_merges_and_classifies() {
        let opts = SimulationOptions::default();
        let mut k = Knowledge::new();
        let c = Coord::new(1, 1);
        k.mark_negative(c);
        consume_place(&mut k, c, 0.5, 3, &opts);
        assert_eq!(k.classify(c), KnowledgeClass::Negative);
        assert_eq!(k.stamp(c), 0);

        consume_place(&mut k, c, 1.0, 8, &opts);
        consume_place(&mut k, c, 1.0, 9, &opts);
        assert_eq!(k.classify(c), KnowledgeClass::Positive);
        assert!(!k.is_negative(c));
        assert!(k.value_or_neutral(c) <= 1.0);
        assert_eq!(k.stamp(c), 9);
    }

    #[test]
    fn consume_path_only_stamps() {
        let mut k = Knowledge::new();
        k.accumulate(Coord::new(0, 1), 0.4);
        consume_path(&mut k, [(Coord::new(0, 1), 6), (Coord::new(0, 2), 7)]);
        assert!((k.value_or_neutral(Coord::new(0, 1)) - 0.4).abs() < 1e-9);
        assert_eq!(k.value(Coord::new(0, 2)), Some(0.0));
        assert_eq!(k.stamp(Coord::new(0, 2)), 7);
        assert_eq!(k.positive().count(), 0);
    }

    #[test]
    fn place_mode_discloses_the_cell() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::Place);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap();
        assert_eq!(outcome.good_mode, Some(GoodShareMode::Place));
        assert_eq!(outcome.positive, vec![FOOD]);
        assert!(peer.is_positive(FOOD));
        assert_eq!(peer.stamp(FOOD), 5);
        assert!(!peer.is_known(Coord::new(0, 2)));
    }

    #[test]
    fn path_and_place_discloses_route_and_cell() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::PathAndPlace);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        for col in 1..3 {
            assert_eq!(peer.stamp(Coord::new(0, col)), 4);
        }
        assert!(peer.is_positive(FOOD));
    }

    #[test]
    fn path_mode_keeps_the_value_secret() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::Path);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        assert!(peer.is_known(Coord::new(0, 2)));
        assert!(!peer.is_positive(FOOD));
        assert_eq!(peer.value(FOOD), Some(0.0));
    }

    #[test]
    fn direction_mode_stamps_the_line() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::Direction);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        assert_eq!(peer.stamp(Coord::new(0, 1)), 5);
        assert_eq!(peer.stamp(Coord::new(0, 2)), 5);
        assert!(!peer.is_known(FOOD));
    }

    #[test]
    fn distributed_mode_blurs_the_value() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::DistributedPlace);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        assert!((peer.value_or_neutral(FOOD) - 0.1).abs() < 1e-9);
        assert!(!peer.is_positive(FOOD));
    }

    #[test]
    fn stale_or_known_cells_are_not_shared() {
        let (map, sharer, own, mut peer) = scene();
        let opts = options_with_good_band(GoodShareMode::Place);
        let mut rng = SmallRng::seed_from_u64(42);

        // The peer already holds fresher news.
        peer.set_stamp(FOOD, 9);
        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok_and(|o| o.is_empty()));
        assert!(!peer.is_positive(FOOD));

        // Same classification on both sides.
        let mut agreeing = Knowledge::seeded(map.start());
        agreeing.mark_positive(FOOD);
        let outcome = sharer.share_knowledge(&own, &mut agreeing, &map, &opts, &mut rng);
        assert!(outcome.is_ok_and(|o| o.positive.is_empty()));
    }

    #[test]
    fn zero_chance_shares_nothing() {
        let (map, sharer, own, mut peer) = scene();
        let opts = SimulationOptions {
            share_chance: 0.0,
            ..options_with_good_band(GoodShareMode::Place)
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok_and(|o| o.is_empty()));
    }

    #[test]
    fn negative_place_is_disclosed() {
        let (map, sharer, mut own, mut peer) = scene();
        let trap = Coord::new(0, 4);
        own.accumulate(trap, -1.0);
        own.mark_negative(trap);
        own.set_stamp(trap, 6);
        let opts = options_with_good_band(GoodShareMode::Place);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = sharer.share_knowledge(&own, &mut peer, &map, &opts, &mut rng);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap();
        assert_eq!(outcome.bad_mode, Some(BadShareMode::Place));
        assert!(peer.is_negative(trap));
        assert_eq!(peer.stamp(trap), 6);
    }
}
