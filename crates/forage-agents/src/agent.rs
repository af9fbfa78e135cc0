//! The forager state machine.
//!
//! An [`Agent`] alternates between three implicit phases. At home with no
//! errand it picks a target; en route it follows a planned path one hop per
//! tick; on arrival it turns around and heads home. Every tick the
//! environment resolves the chosen hop and feeds the outcome back through
//! [`Agent::receive_reward`], which is where the agent learns.
//!
//! Agents never own the map and, depending on the run, may not own their
//! knowledge either; both are passed in by the caller.

use forage_types::{AgentId, Coord, KnowledgeClass, Reward, SimulationOptions};
use forage_world::hex::approx_eq;
use forage_world::{Knowledge, Map};
use rand::Rng;
use tracing::{debug, trace};

use crate::error::AgentError;

/// A single forager.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: AgentId,
    home: Coord,
    position: Coord,
    target: Coord,
    /// Remaining hops, next hop last.
    path: Vec<Coord>,
    decision: Coord,
    alive: bool,
    lifetime: u64,
    carrying_food: bool,
    food_timer: u32,
    hungry: bool,
    sharing: bool,
    viewed: bool,
    new_knowledge: u64,
}

impl Agent {
    /// Spawn an agent at `home`. The home cell is recorded in its knowledge
    /// with a neutral value.
    pub fn new(id: AgentId, home: Coord, knowledge: &mut Knowledge) -> Self {
        knowledge.set_value(home, 0.0);
        Self {
            id,
            home,
            position: home,
            target: home,
            path: Vec::new(),
            decision: home,
            alive: true,
            lifetime: 0,
            carrying_food: false,
            food_timer: 0,
            hungry: false,
            sharing: false,
            viewed: false,
            new_knowledge: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Choose this tick's hop and return it.
    ///
    /// Arriving home picks a new target, arriving anywhere else turns the
    /// agent homeward. Without a path a new one is planned; a risky plan is
    /// dropped with probability `risky_choices`. The hop is the next cell of
    /// the path, or the current position when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::World`] if the agent's position or target lies
    /// off the map.
    pub fn make_decision(
        &mut self,
        map: &Map,
        knowledge: &Knowledge,
        options: &SimulationOptions,
        rng: &mut impl Rng,
    ) -> Result<Coord, AgentError> {
        if self.target == map.start() && self.target == self.position {
            self.choose_target(map, knowledge, options, rng);
        } else if self.target == self.position {
            self.target = map.start();
        }

        if self.path.is_empty() {
            let plan = map.search_path(self.position, self.target, knowledge)?;
            if plan.is_risky() && rng.random::<f64>() < options.risky_choices {
                debug!(agent = %self.id, cost = plan.total_cost, "risky route refused");
            } else {
                self.path = plan.path;
            }
        }

        self.decision = self.path.pop().unwrap_or(self.position);
        trace!(agent = %self.id, from = %self.position, to = %self.decision, "decision");
        Ok(self.decision)
    }

    /// Pick a new target: a random positive cell whose value exceeds
    /// `target_threshold`, or a random cell of the map when none does.
    pub fn choose_target(
        &mut self,
        map: &Map,
        knowledge: &Knowledge,
        options: &SimulationOptions,
        rng: &mut impl Rng,
    ) {
        let choices: Vec<Coord> = knowledge
            .positive()
            .filter(|c| knowledge.value_or_neutral(*c) > options.target_threshold)
            .collect();

        self.target = if choices.is_empty() {
            let dims = map.dimensions();
            Coord::new(
                rng.random_range(0..dims.rows.max(1)),
                rng.random_range(0..dims.cols.max(1)),
            )
        } else {
            let pick = rng.random_range(0..choices.len());
            choices.get(pick).copied().unwrap_or(self.home)
        };
        debug!(agent = %self.id, target = %self.target, known = choices.len(), "target chosen");
    }

    // -----------------------------------------------------------------------
    // Learning
    // -----------------------------------------------------------------------

    /// Assimilate the outcome of this tick's decision.
    ///
    /// Strong rewards classify the destination and send the agent home. A
    /// reward that disagrees with what the agent believed about its decision
    /// cell counts as new knowledge and invalidates the plan. A move that
    /// did not land on the decision cell marks that cell blocked. Finally the
    /// reward is added to the belief about the landing cell, which is
    /// stamped with the current step, and the agent moves there.
    pub fn receive_reward(
        &mut self,
        reward: Reward,
        knowledge: &mut Knowledge,
        options: &SimulationOptions,
    ) {
        let landed = reward.next_position;

        if options.is_good(reward.value) {
            if knowledge.mark_positive(landed) {
                self.note_new_knowledge();
            }
            self.carrying_food = true;
            self.target = self.home;
            self.path.clear();
        } else if options.is_bad(reward.value) {
            if knowledge.mark_negative(landed) {
                self.note_new_knowledge();
            }
            self.target = self.home;
            self.path.clear();
        }

        let previous = knowledge.remember(self.decision);
        if !approx_eq(reward.value, previous) {
            if previous > options.good_threshold && reward.value < options.good_threshold {
                knowledge.unmark_positive(self.decision);
            }
            if previous < options.bad_threshold && reward.value > options.bad_threshold {
                knowledge.unmark_negative(self.decision);
            }
            self.note_new_knowledge();
            self.path.clear();
        }

        if self.decision != landed {
            knowledge.mark_blocked(self.decision);
            self.path.clear();
            debug!(agent = %self.id, cell = %self.decision, "move blocked");
        }

        knowledge.accumulate(landed, reward.value);
        knowledge.set_stamp(landed, options.step_counter);
        self.position = landed;
    }

    fn note_new_knowledge(&mut self) {
        self.new_knowledge = self.new_knowledge.saturating_add(1);
    }

    // -----------------------------------------------------------------------
    // Vitals
    // -----------------------------------------------------------------------

    /// Advance the hunger timer by one tick.
    ///
    /// Past half of `foodless_survival` the agent is starving; past all of
    /// it the agent dies.
    pub fn increase_food_timer(&mut self, options: &SimulationOptions) {
        self.food_timer = self.food_timer.saturating_add(1);
        self.hungry = false;
        if self.food_timer > options.foodless_survival {
            self.die();
        } else if self.food_timer > options.foodless_survival / 2 {
            self.hungry = true;
        }
    }

    /// The agent has eaten.
    pub const fn reset_food_timer(&mut self) {
        self.food_timer = 0;
    }

    /// Age the agent by one tick.
    pub const fn next_day(&mut self) {
        self.lifetime = self.lifetime.saturating_add(1);
    }

    /// Kill the agent.
    pub fn die(&mut self) {
        if self.alive {
            debug!(agent = %self.id, lifetime = self.lifetime, "agent died");
        }
        self.alive = false;
    }

    /// Pick up food.
    pub const fn give_food(&mut self) {
        self.carrying_food = true;
    }

    /// Hand over carried food.
    pub const fn take_food(&mut self) {
        self.carrying_food = false;
    }

    // -----------------------------------------------------------------------
    // Presentation flags
    // -----------------------------------------------------------------------

    /// Mark the agent as the one being observed.
    pub const fn set_viewed(&mut self, viewed: bool) {
        self.viewed = viewed;
    }

    /// Mark the agent as exchanging knowledge this tick.
    pub const fn set_sharing(&mut self, sharing: bool) {
        self.sharing = sharing;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Stable identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current cell.
    pub const fn get_position(&self) -> Coord {
        self.position
    }

    /// Hop chosen by the last [`Agent::make_decision`].
    pub const fn get_decision(&self) -> Coord {
        self.decision
    }

    /// Cell the agent is currently heading for.
    pub const fn target(&self) -> Coord {
        self.target
    }

    /// Remaining hops, next hop last.
    pub fn path(&self) -> &[Coord] {
        &self.path
    }

    /// Home cell the agent was spawned at.
    pub const fn home(&self) -> Coord {
        self.home
    }

    /// Whether the agent is alive.
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Ticks lived.
    pub const fn lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Whether the agent is carrying food home.
    pub const fn carrying_food(&self) -> bool {
        self.carrying_food
    }

    /// Whether the agent is past half its starvation horizon.
    pub const fn starving(&self) -> bool {
        self.hungry
    }

    /// Ticks since the agent last ate.
    pub const fn hunger(&self) -> u32 {
        self.food_timer
    }

    /// Whether the agent exchanged knowledge this tick.
    pub const fn is_sharing(&self) -> bool {
        self.sharing
    }

    /// Whether the agent is the one being observed.
    pub const fn is_viewed(&self) -> bool {
        self.viewed
    }

    /// How many times the agent has learned something new.
    pub const fn new_knowledge(&self) -> u64 {
        self.new_knowledge
    }

    /// What `knowledge` (the agent's own) says about `coord`.
    pub fn know_of(&self, knowledge: &Knowledge, coord: Coord) -> KnowledgeClass {
        knowledge.classify(coord)
    }
}
