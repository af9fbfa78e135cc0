//! Per-step orchestration.
//!
//! Each call to [`Environment::step`] runs four phases in a fixed order:
//!
//! 1. **Locks** -- sharing locks count down; expired ones are removed.
//! 2. **Actions** -- every unlocked agent decides and its move is resolved
//!    against the map; every agent then ages and grows hungrier.
//! 3. **Exchange** -- unless knowledge is common, every ordered pair of
//!    nearby, free, well-fed agents may share knowledge.
//! 4. **Mutation** -- periodically one random cell grows food, water or a
//!    hazard.
//!
//! Agents are processed in population order and the exchange phase sees the
//! positions produced by this tick's actions.

use std::collections::{BTreeMap, BTreeSet};

use forage_agents::{Agent, KnowledgeBank};
use forage_types::{AgentId, Coord, Field, Reward, SimulationOptions};
use forage_world::{Map, hex};
use rand::Rng;
use tracing::debug;

use crate::error::EnvironmentError;

/// What happened during one [`Environment::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSummary {
    /// Agents that decided and acted.
    pub acted: usize,
    /// Knowledge exchanges performed.
    pub exchanges: usize,
    /// Agents that died.
    pub deaths: usize,
    /// Cell overwritten by terrain mutation, with its new kind.
    pub mutation: Option<(Coord, Field)>,
}

/// Last knowledge counters exchanged between two agents, keyed by the
/// ordered id pair (lower id first).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ShareMemo {
    low: u64,
    high: u64,
}

/// Run-wide bookkeeping that outlives individual agents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Remaining extractions per resource or hazard cell already used.
    richness: BTreeMap<Coord, i64>,
    /// Every cell some agent has tried to enter.
    discovered: BTreeSet<Coord>,
    /// Knowledge counters last exchanged per agent pair.
    memo: BTreeMap<(AgentId, AgentId), ShareMemo>,
    /// Remaining lock steps per agent after an exchange.
    locks: BTreeMap<AgentId, u32>,
    /// Lifetimes of agents that died.
    lifetimes: Vec<u64>,
}

impl Environment {
    /// Fresh bookkeeping for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells agents have tried to enter.
    pub const fn get_discovered(&self) -> &BTreeSet<Coord> {
        &self.discovered
    }

    /// Lifetimes of the agents that died, in order of death.
    pub fn get_lifetimes(&self) -> &[u64] {
        &self.lifetimes
    }

    /// Remaining extractions of `coord`, if it has been used.
    pub fn richness(&self, coord: Coord) -> Option<i64> {
        self.richness.get(&coord).copied()
    }

    /// Remaining lock steps of `agent`, if locked.
    pub fn lock_remaining(&self, agent: AgentId) -> Option<u32> {
        self.locks.get(&agent).copied()
    }

    /// Whether `agent` is under a sharing lock.
    pub fn is_locked(&self, agent: AgentId) -> bool {
        self.locks.contains_key(&agent)
    }

    /// Knowledge counter `sharer` had when it last shared with `peer`;
    /// `0` if it never did.
    pub fn last_shared(&self, sharer: AgentId, peer: AgentId) -> u64 {
        let key = (sharer.min(peer), sharer.max(peer));
        self.memo
            .get(&key)
            .map_or(0, |m| if sharer <= peer { m.low } else { m.high })
    }

    fn record_shared(&mut self, sharer: AgentId, peer: AgentId, counter: u64) {
        let entry = self
            .memo
            .entry((sharer.min(peer), sharer.max(peer)))
            .or_default();
        if sharer <= peer {
            entry.low = counter;
        } else {
            entry.high = counter;
        }
    }

    /// Drop the exchange memo entries and locks of every agent not in
    /// `living`.
    pub fn forget_departed(&mut self, living: &BTreeSet<AgentId>) {
        self.memo
            .retain(|(a, b), _| living.contains(a) && living.contains(b));
        self.locks.retain(|id, _| living.contains(id));
    }

    fn lock(&mut self, agent: AgentId, duration: u32) {
        if duration > 0 {
            self.locks.insert(agent, duration);
        }
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the world by one tick. See the module documentation for the
    /// phase order.
    pub fn step(
        &mut self,
        agents: &mut [Agent],
        map: &mut Map,
        bank: &mut KnowledgeBank,
        options: &mut SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<StepSummary, EnvironmentError> {
        let mut summary = StepSummary::default();

        // 1. Locks
        self.locks.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });

        // 2. Actions
        for agent in agents.iter_mut() {
            if !self.is_locked(agent.id()) {
                agent.set_sharing(false);
                let knowledge = bank.get(agent.id()).map_err(|source| EnvironmentError::Agent {
                    agent_id: agent.id(),
                    source,
                })?;
                agent
                    .make_decision(map, knowledge, options, rng)
                    .map_err(|source| EnvironmentError::Agent {
                        agent_id: agent.id(),
                        source,
                    })?;
                self.do_action(agent, map, bank, options, rng)?;
                summary.acted = summary.acted.saturating_add(1);
            }
            agent.increase_food_timer(options);
            agent.next_day();
            if !agent.is_alive() {
                self.lifetimes.push(agent.lifetime());
                summary.deaths = summary.deaths.saturating_add(1);
            }
        }

        // 3. Exchange
        if !options.common_knowledge {
            summary.exchanges = self.exchange(agents, map, bank, options, rng)?;
        }

        // 4. Mutation
        if options.terrain_mutation_due(options.step_counter) {
            summary.mutation = Self::mutate_terrain(map, rng)?;
        }

        Ok(summary)
    }

    /// Resolve `agent`'s decision against the map and reward it.
    ///
    /// Returns the kind of cell the agent tried to enter.
    pub fn do_action(
        &mut self,
        agent: &mut Agent,
        map: &mut Map,
        bank: &mut KnowledgeBank,
        options: &mut SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<Field, EnvironmentError> {
        let id = agent.id();
        let decision = agent.get_decision();
        let field = map.get_field(decision)?;
        self.discovered.insert(decision);

        let reward = match field {
            Field::Blocked => Some(Reward::neutral(agent.get_position())),
            Field::Food | Field::Water => {
                agent.reset_food_timer();
                agent.give_food();
                Some(Reward::gain(decision))
            }
            Field::Danger => {
                if rng.random::<f64>() < options.survival_chance {
                    Some(Reward::harm(decision))
                } else {
                    agent.die();
                    debug!(agent = %id, cell = %decision, "killed by hazard");
                    None
                }
            }
            Field::Population => {
                if agent.carrying_food() {
                    agent.take_food();
                    options.total_food = options.total_food.saturating_add(1);
                    agent.reset_food_timer();
                } else if options.total_food > 0 {
                    options.total_food = options.total_food.saturating_sub(1);
                    agent.reset_food_timer();
                }
                Some(Reward::neutral(decision))
            }
            Field::Empty => Some(Reward::neutral(decision)),
        };

        if let Some(reward) = reward {
            let knowledge = bank
                .get_mut(id)
                .map_err(|source| EnvironmentError::Agent { agent_id: id, source })?;
            agent.receive_reward(reward, knowledge, options);
            if field.is_depletable() {
                self.deplete(decision, map, options)?;
            }
        }

        Ok(field)
    }

    /// Take one extraction from `coord`, reverting it to empty once the
    /// counter drops below zero.
    fn deplete(
        &mut self,
        coord: Coord,
        map: &mut Map,
        options: &SimulationOptions,
    ) -> Result<(), EnvironmentError> {
        let counter = self
            .richness
            .entry(coord)
            .or_insert_with(|| i64::from(options.default_field_value));
        *counter = counter.saturating_sub(1);
        if *counter < 0 {
            self.richness.remove(&coord);
            let previous = map.change_field(coord, Field::Empty)?;
            debug!(cell = %coord, ?previous, "cell exhausted");
        }
        Ok(())
    }

    /// Pairwise knowledge exchange over every ordered pair of agents.
    /// Returns the number of exchanges.
    fn exchange(
        &mut self,
        agents: &mut [Agent],
        map: &Map,
        bank: &mut KnowledgeBank,
        options: &SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<usize, EnvironmentError> {
        let mut exchanges: usize = 0;
        let count = agents.len();

        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                let (Some(sharer), Some(peer)) = (agents.get(i), agents.get(j)) else {
                    continue;
                };
                let (a1, a2) = (sharer.id(), peer.id());
                if !sharer.is_alive()
                    || !peer.is_alive()
                    || self.is_locked(a1)
                    || self.is_locked(a2)
                    || (self.last_shared(a1, a2) == sharer.new_knowledge()
                        && rng.random::<f64>() > options.repeated_share)
                    || sharer.starving()
                    || peer.starving()
                {
                    continue;
                }

                let distance = hex::straight_line_distance(sharer.get_position(), peer.get_position());
                if f64::from(distance) >= options.share_radius {
                    continue;
                }

                let outcome = bank
                    .with_pair(a1, a2, |own, theirs| {
                        sharer.share_knowledge(own, theirs, map, options, rng)
                    })
                    .and_then(|result| result)
                    .map_err(|source| EnvironmentError::Agent { agent_id: a1, source })?;
                debug!(
                    sharer = %a1,
                    peer = %a2,
                    positive = outcome.positive.len(),
                    negative = outcome.negative.len(),
                    "agents exchanged knowledge"
                );

                self.record_shared(a1, a2, sharer.new_knowledge());
                self.lock(a1, options.learn_time);
                self.lock(a2, options.learn_time);
                if let Some(agent) = agents.get_mut(i) {
                    agent.set_sharing(true);
                }
                if let Some(agent) = agents.get_mut(j) {
                    agent.set_sharing(true);
                }
                exchanges = exchanges.saturating_add(1);
            }
        }

        Ok(exchanges)
    }

    /// Overwrite one random cell with a random resource or hazard, unless
    /// it is the home or blocked.
    fn mutate_terrain(
        map: &mut Map,
        rng: &mut impl Rng,
    ) -> Result<Option<(Coord, Field)>, EnvironmentError> {
        let dims = map.dimensions();
        let cell = Coord::new(
            rng.random_range(0..dims.rows.max(1)),
            rng.random_range(0..dims.cols.max(1)),
        );
        let current = map.get_field(cell)?;
        if matches!(current, Field::Population | Field::Blocked) {
            return Ok(None);
        }
        let kind = Field::MUTATION_KINDS
            .get(rng.random_range(0..Field::MUTATION_KINDS.len()))
            .copied()
            .unwrap_or(Field::Food);
        map.change_field(cell, kind)?;
        debug!(%cell, ?current, ?kind, "terrain mutated");
        Ok(Some((cell, kind)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    /// Home at (0, 0) walled in by blocked cells, food at (0, 2).
    const ENCLOSED: &str = "PXF\nXX.";

    fn setup(
        source: &str,
        count: u32,
        options: &SimulationOptions,
    ) -> (Map, KnowledgeBank, Vec<Agent>) {
        let map = Map::load(source).unwrap();
        let mut bank = KnowledgeBank::new(options.common_knowledge);
        let agents = (0..count)
            .map(|i| {
                let id = AgentId(i);
                Agent::new(id, map.start(), bank.register(id))
            })
            .collect();
        (map, bank, agents)
    }

    /// Make `id` believe `coord` is a rich find, learned on `stamp`.
    fn plant_belief(bank: &mut KnowledgeBank, id: AgentId, coord: Coord, stamp: u64) {
        let k = bank.get_mut(id).unwrap();
        k.accumulate(coord, 1.0);
        k.mark_positive(coord);
        k.set_stamp(coord, stamp);
    }

    fn sharing_options() -> SimulationOptions {
        SimulationOptions {
            share_chance: 1.0,
            repeated_share: 1.0,
            share_good_path_place: 0.0,
            share_good_path: 0.0,
            share_good_place: 1.0,
            learn_time: 2,
            terrain_modify_step: 0,
            step_counter: 1,
            ..SimulationOptions::default()
        }
    }

    fn act(
        env: &mut Environment,
        agent: &mut Agent,
        map: &mut Map,
        bank: &mut KnowledgeBank,
        options: &mut SimulationOptions,
        rng: &mut SmallRng,
    ) -> Field {
        let knowledge = bank.get(agent.id()).unwrap();
        agent.make_decision(map, knowledge, options, rng).unwrap();
        env.do_action(agent, map, bank, options, rng).unwrap()
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    #[test]
    fn food_rewards_and_depletes() {
        let mut options = SimulationOptions {
            default_field_value: 1,
            step_counter: 1,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("PF", 1, &options);
        let food = Coord::new(0, 1);
        plant_belief(&mut bank, AgentId(0), food, 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agents.first_mut().unwrap();

        let field = act(&mut env, agent, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field, Field::Food);
        assert_eq!(agent.get_position(), food);
        assert!(agent.carrying_food());
        assert_eq!(env.richness(food), Some(0));
        assert_eq!(map.get_field(food).ok(), Some(Field::Food));
        assert!(env.get_discovered().contains(&food));

        // Second extraction drops the counter below zero.
        let field = env.do_action(agent, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field.ok(), Some(Field::Food));
        assert_eq!(map.get_field(food).ok(), Some(Field::Empty));
        assert_eq!(env.richness(food), None);
    }

    #[test]
    fn zero_richness_exhausts_on_first_visit() {
        let mut options = SimulationOptions {
            default_field_value: 0,
            step_counter: 1,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("PW", 1, &options);
        plant_belief(&mut bank, AgentId(0), Coord::new(0, 1), 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agents.first_mut().unwrap();

        let field = act(&mut env, agent, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field, Field::Water);
        assert_eq!(map.get_field(Coord::new(0, 1)).ok(), Some(Field::Empty));
    }

    #[test]
    fn blocked_move_keeps_position() {
        let mut options = SimulationOptions::default();
        let (mut map, mut bank, mut agents) = setup("PX", 1, &options);
        let wall = Coord::new(0, 1);
        plant_belief(&mut bank, AgentId(0), wall, 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agents.first_mut().unwrap();

        let field = act(&mut env, agent, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field, Field::Blocked);
        assert_eq!(agent.get_position(), map.start());
        assert!(bank.get(AgentId(0)).unwrap().is_blocked(wall));
        assert!(env.get_discovered().contains(&wall));
    }

    #[test]
    fn surviving_danger_harms_and_wears_it() {
        let mut options = SimulationOptions {
            survival_chance: 1.0,
            default_field_value: 3,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("PT", 1, &options);
        let hazard = Coord::new(0, 1);
        plant_belief(&mut bank, AgentId(0), hazard, 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agents.first_mut().unwrap();

        let field = act(&mut env, agent, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field, Field::Danger);
        assert!(agent.is_alive());
        assert_eq!(agent.get_position(), hazard);
        assert!(bank.get(AgentId(0)).unwrap().is_negative(hazard));
        assert_eq!(env.richness(hazard), Some(2));
    }

    #[test]
    fn fatal_danger_leaves_it_intact() {
        let mut options = SimulationOptions {
            survival_chance: 0.0,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("PT", 1, &options);
        let hazard = Coord::new(0, 1);
        plant_belief(&mut bank, AgentId(0), hazard, 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let agent = agents.first_mut().unwrap();

        act(&mut env, agent, &mut map, &mut bank, &mut options, &mut rng);
        assert!(!agent.is_alive());
        assert_eq!(agent.get_position(), map.start());
        assert_eq!(env.richness(hazard), None);
    }

    #[test]
    fn home_takes_deposits_and_feeds() {
        let mut options = SimulationOptions {
            foodless_survival: 10,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("P", 2, &options);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);

        for agent in &mut agents {
            agent.increase_food_timer(&options);
        }
        let (first, rest) = agents.split_first_mut().unwrap();
        let second = rest.first_mut().unwrap();

        first.give_food();
        let field = act(&mut env, first, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(field, Field::Population);
        assert_eq!(options.total_food, 1);
        assert!(!first.carrying_food());
        assert_eq!(first.hunger(), 0);

        act(&mut env, second, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(options.total_food, 0);
        assert_eq!(second.hunger(), 0);

        second.increase_food_timer(&options);
        act(&mut env, second, &mut map, &mut bank, &mut options, &mut rng);
        assert_eq!(second.hunger(), 1);
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    #[test]
    fn exchange_teaches_peer_and_locks_both() {
        let mut options = sharing_options();
        let (mut map, mut bank, mut agents) = setup(ENCLOSED, 2, &options);
        let food = Coord::new(0, 2);
        plant_belief(&mut bank, AgentId(0), food, 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);

        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng);
        let summary = summary.unwrap();
        assert_eq!(summary.acted, 2);
        assert_eq!(summary.exchanges, 1);
        assert!(bank.get(AgentId(1)).unwrap().is_positive(food));
        assert!(bank.get(AgentId(1)).unwrap().value_or_neutral(food) <= 1.0);
        assert!(agents.iter().all(Agent::is_sharing));
        assert_eq!(env.lock_remaining(AgentId(0)), Some(2));
        assert_eq!(env.lock_remaining(AgentId(1)), Some(2));
        assert_eq!(env.last_shared(AgentId(0), AgentId(1)), agents.first().unwrap().new_knowledge());

        options.step_counter = 2;
        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
        assert_eq!(summary.acted, 0);
        assert_eq!(env.lock_remaining(AgentId(0)), Some(1));
        assert!(agents.iter().all(|a| a.lifetime() == 2));

        options.step_counter = 3;
        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
        assert_eq!(summary.acted, 2);
    }

    #[test]
    fn zero_learn_time_never_locks() {
        let mut options = SimulationOptions {
            learn_time: 0,
            ..sharing_options()
        };
        let (mut map, mut bank, mut agents) = setup(ENCLOSED, 2, &options);
        plant_belief(&mut bank, AgentId(0), Coord::new(0, 2), 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);

        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
        assert_eq!(summary.exchanges, 2);
        assert!(!env.is_locked(AgentId(0)));
        assert!(!env.is_locked(AgentId(1)));
    }

    #[test]
    fn common_knowledge_skips_exchange() {
        let mut options = SimulationOptions {
            common_knowledge: true,
            ..sharing_options()
        };
        let (mut map, mut bank, mut agents) = setup(ENCLOSED, 2, &options);
        plant_belief(&mut bank, AgentId(0), Coord::new(0, 2), 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);

        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
        assert_eq!(summary.exchanges, 0);
        assert!(bank.get(AgentId(1)).unwrap().is_positive(Coord::new(0, 2)));
    }

    #[test]
    fn starving_agents_do_not_share() {
        let mut options = SimulationOptions {
            foodless_survival: 1,
            ..sharing_options()
        };
        let (mut map, mut bank, mut agents) = setup(ENCLOSED, 2, &options);
        plant_belief(&mut bank, AgentId(0), Coord::new(0, 2), 1);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(42);

        let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
        assert!(agents.iter().all(Agent::starving));
        assert_eq!(summary.exchanges, 0);
    }

    #[test]
    fn departed_agents_leave_no_exchange_state() {
        let mut env = Environment::new();
        env.record_shared(AgentId(0), AgentId(1), 4);
        env.record_shared(AgentId(2), AgentId(1), 7);
        env.lock(AgentId(0), 3);
        env.lock(AgentId(1), 3);

        let living: BTreeSet<AgentId> = [AgentId(1), AgentId(2)].into_iter().collect();
        env.forget_departed(&living);

        assert_eq!(env.memo.len(), 1);
        assert_eq!(env.last_shared(AgentId(0), AgentId(1)), 0);
        assert_eq!(env.last_shared(AgentId(2), AgentId(1)), 7);
        assert!(!env.is_locked(AgentId(0)));
        assert!(env.is_locked(AgentId(1)));
    }

    #[test]
    fn mutation_never_touches_home_or_walls() {
        let mut options = SimulationOptions {
            terrain_modify_step: 1,
            start_agent_count: 0,
            ..SimulationOptions::default()
        };
        let (mut map, mut bank, mut agents) = setup("PX..", 0, &options);
        let mut env = Environment::new();
        let mut rng = SmallRng::seed_from_u64(9);

        for step in 1..200 {
            options.step_counter = step;
            let summary = env.step(&mut agents, &mut map, &mut bank, &mut options, &mut rng).unwrap();
            if let Some((cell, kind)) = summary.mutation {
                assert!(Field::MUTATION_KINDS.contains(&kind));
                assert_ne!(cell, map.start());
            }
        }
        assert_eq!(map.get_field(Coord::new(0, 0)).ok(), Some(Field::Population));
        assert_eq!(map.get_field(Coord::new(0, 1)).ok(), Some(Field::Blocked));
        assert_eq!(map.count(Field::Empty), 0);
    }
}
