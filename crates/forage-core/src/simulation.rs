//! Simulation lifecycle: population, spawning, time and observation.

use std::collections::BTreeSet;

use forage_agents::{Agent, KnowledgeBank};
use forage_types::{AgentId, Coord, KnowledgeClass, SimulationOptions};
use forage_world::{Knowledge, Map};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::environment::{Environment, StepSummary};
use crate::error::SimulationError;

/// One run of the foraging simulation.
///
/// Owns the map, the population, the knowledge bank, the environment's
/// bookkeeping and the random source. The run ends when the population dies
/// out; a step budget, if any, is the caller's business.
#[derive(Debug, Clone)]
pub struct Simulation {
    map: Map,
    options: SimulationOptions,
    environment: Environment,
    bank: KnowledgeBank,
    agents: Vec<Agent>,
    rng: StdRng,
    next_id: AgentId,
    viewed: Option<AgentId>,
    finished: bool,
}

impl Simulation {
    /// Start a run on `map`. The random source is seeded from
    /// `options.seed`, or from the OS when no seed is set.
    pub fn new(map: Map, options: SimulationOptions) -> Self {
        let rng = options
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self::with_rng(map, options, rng)
    }

    /// Start a run with an explicit random source.
    pub fn with_rng(map: Map, options: SimulationOptions, rng: StdRng) -> Self {
        let bank = KnowledgeBank::new(options.common_knowledge);
        let mut sim = Self {
            map,
            options,
            environment: Environment::new(),
            bank,
            agents: Vec::new(),
            rng,
            next_id: AgentId(0),
            viewed: None,
            finished: false,
        };
        for _ in 0..sim.options.start_agent_count {
            sim.spawn();
        }
        info!(
            name = %sim.options.name,
            agents = sim.agents.len(),
            home = %sim.map.start(),
            common_knowledge = sim.options.common_knowledge,
            "simulation started"
        );
        sim
    }

    /// Add one agent at home and return its id.
    pub fn spawn(&mut self) -> AgentId {
        let id = self.next_id;
        self.next_id = id.next();
        let knowledge = self.bank.register(id);
        self.agents.push(Agent::new(id, self.map.start(), knowledge));
        debug!(agent = %id, step = self.options.step_counter, "agent spawned");
        id
    }

    /// Advance the run by one tick.
    ///
    /// Does nothing once the run has finished. An empty population finishes
    /// the run instead of stepping. Otherwise a new agent may spawn, the
    /// environment resolves the tick, and dead agents are removed.
    pub fn step(&mut self) -> Result<StepSummary, SimulationError> {
        if self.finished {
            return Ok(StepSummary::default());
        }
        self.options.step_counter = self.options.step_counter.saturating_add(1);
        let step = self.options.step_counter;

        if self.agents.is_empty() {
            self.finished = true;
            info!(step, total_food = self.options.total_food, "population died");
            return Ok(StepSummary::default());
        }

        if self.options.spawn_due(step) {
            self.spawn();
        }

        let summary = self
            .environment
            .step(
                &mut self.agents,
                &mut self.map,
                &mut self.bank,
                &mut self.options,
                &mut self.rng,
            )
            .map_err(|source| SimulationError::Step { step, source })?;

        if let Some(id) = self.viewed
            && self.agents.iter().any(|a| a.id() == id && !a.is_alive())
        {
            self.disable_view();
        }

        let bank = &mut self.bank;
        self.agents.retain(|agent| {
            if !agent.is_alive() {
                bank.release(agent.id());
            }
            agent.is_alive()
        });
        if summary.deaths > 0 {
            let living: BTreeSet<AgentId> = self.agents.iter().map(Agent::id).collect();
            self.environment.forget_departed(&living);
        }

        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Observe the agent after the current one, wrapping around; the first
    /// agent when none is observed.
    pub fn show_next_agent(&mut self) {
        if self.agents.is_empty() {
            return;
        }
        let next = self
            .viewed
            .and_then(|id| self.agents.iter().position(|a| a.id() == id))
            .map_or(0, |idx| idx.saturating_add(1) % self.agents.len());
        self.disable_view();
        if let Some(agent) = self.agents.get_mut(next) {
            agent.set_viewed(true);
            self.viewed = Some(agent.id());
        }
    }

    /// Stop observing.
    pub fn disable_view(&mut self) {
        if let Some(id) = self.viewed.take()
            && let Some(agent) = self.agents.iter_mut().find(|a| a.id() == id)
        {
            agent.set_viewed(false);
        }
    }

    /// The observed agent, if any.
    pub fn viewed_agent(&self) -> Option<&Agent> {
        self.viewed
            .and_then(|id| self.agents.iter().find(|a| a.id() == id))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether the population has died out.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of living agents.
    pub fn agents_count(&self) -> usize {
        self.agents.len()
    }

    /// The living agents in population order.
    pub fn get_agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Living agent with `id`.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    /// Options, mutable for live tuning between steps.
    pub const fn options_mut(&mut self) -> &mut SimulationOptions {
        &mut self.options
    }

    /// Options, read-only.
    pub const fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// The environment's bookkeeping.
    pub const fn get_env(&self) -> &Environment {
        &self.environment
    }

    /// The terrain.
    pub const fn map(&self) -> &Map {
        &self.map
    }

    /// The knowledge bank.
    pub const fn bank(&self) -> &KnowledgeBank {
        &self.bank
    }

    /// Knowledge of a living agent.
    pub fn knowledge_of(&self, id: AgentId) -> Result<&Knowledge, SimulationError> {
        let agent = self.agent(id).ok_or(SimulationError::AgentNotFound(id))?;
        Ok(self.bank.get(agent.id())?)
    }

    /// How a living agent classifies `coord`.
    pub fn know_of(&self, id: AgentId, coord: Coord) -> Result<KnowledgeClass, SimulationError> {
        let agent = self.agent(id).ok_or(SimulationError::AgentNotFound(id))?;
        let knowledge = self.bank.get(id)?;
        Ok(agent.know_of(knowledge, coord))
    }

    /// Fraction of the map some agent has tried to enter.
    #[allow(clippy::cast_precision_loss)]
    pub fn discovered_fraction(&self) -> f64 {
        let area = self.map.area();
        if area == 0 {
            return 0.0;
        }
        self.environment.get_discovered().len() as f64 / area as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn options() -> SimulationOptions {
        SimulationOptions {
            seed: Some(42),
            agent_spawn_time: 0,
            terrain_modify_step: 0,
            ..SimulationOptions::default()
        }
    }

    fn sim(source: &str, options: SimulationOptions) -> Simulation {
        Simulation::new(Map::load(source).unwrap(), options)
    }

    #[test]
    fn starts_with_configured_population() {
        let s = sim("P..\n.F.", options());
        assert_eq!(s.agents_count(), 3);
        assert!(!s.is_finished());
        let ids: Vec<AgentId> = s.get_agents().iter().map(Agent::id).collect();
        assert_eq!(ids, vec![AgentId(0), AgentId(1), AgentId(2)]);
        assert!(s.get_agents().iter().all(|a| a.get_position() == Coord::new(0, 0)));
    }

    #[test]
    fn step_advances_counter() {
        let mut s = sim("P..\n.F.", options());
        assert!(s.step().is_ok());
        assert!(s.step().is_ok());
        assert_eq!(s.options().step_counter, 2);
    }

    #[test]
    fn spawning_follows_interval() {
        let mut s = sim(
            "P..\n...",
            SimulationOptions {
                agent_spawn_time: 2,
                start_agent_count: 1,
                ..options()
            },
        );
        assert!(s.step().is_ok());
        assert_eq!(s.agents_count(), 1);
        assert!(s.step().is_ok());
        assert_eq!(s.agents_count(), 2);
        assert!(s.agent(AgentId(1)).is_some());
    }

    #[test]
    fn empty_population_finishes() {
        let mut s = sim(
            "P.",
            SimulationOptions {
                start_agent_count: 0,
                ..options()
            },
        );
        assert!(s.step().is_ok());
        assert!(s.is_finished());
        assert!(s.step().is_ok());
        assert_eq!(s.options().step_counter, 1);
    }

    #[test]
    fn live_tuning_applies_to_the_next_step() {
        let mut s = sim("P..\n.F.", options());
        assert!(s.step().is_ok());
        assert_eq!(s.agents_count(), 3);

        s.options_mut().foodless_survival = 0;
        assert_eq!(s.options().foodless_survival, 0);
        assert!(s.step().is_ok());
        assert_eq!(s.agents_count(), 0);
    }

    #[test]
    fn dead_agents_release_their_exchange_state() {
        let mut s = sim(
            "P",
            SimulationOptions {
                start_agent_count: 2,
                repeated_share: 1.0,
                ..options()
            },
        );
        let summary = s.step().unwrap();
        assert_eq!(summary.exchanges, 1);
        assert!(s.get_env().is_locked(AgentId(0)));
        assert!(s.get_env().is_locked(AgentId(1)));

        s.options_mut().foodless_survival = 0;
        let summary = s.step().unwrap();
        assert_eq!(summary.deaths, 2);
        assert_eq!(s.agents_count(), 0);
        assert!(!s.get_env().is_locked(AgentId(0)));
        assert!(!s.get_env().is_locked(AgentId(1)));
        assert_eq!(s.get_env().last_shared(AgentId(0), AgentId(1)), 0);
    }

    #[test]
    fn view_cycles_by_id() {
        let mut s = sim("P..", options());
        assert!(s.viewed_agent().is_none());
        s.show_next_agent();
        assert_eq!(s.viewed_agent().map(Agent::id), Some(AgentId(0)));
        s.show_next_agent();
        assert_eq!(s.viewed_agent().map(Agent::id), Some(AgentId(1)));
        assert!(s.viewed_agent().is_some_and(Agent::is_viewed));
        assert_eq!(s.get_agents().iter().filter(|a| a.is_viewed()).count(), 1);
        s.show_next_agent();
        s.show_next_agent();
        assert_eq!(s.viewed_agent().map(Agent::id), Some(AgentId(0)));
        s.disable_view();
        assert!(s.viewed_agent().is_none());
        assert!(s.get_agents().iter().all(|a| !a.is_viewed()));
    }

    #[test]
    fn knowledge_queries_by_id() {
        let s = sim("P..", options());
        assert_eq!(
            s.know_of(AgentId(0), Coord::new(0, 0)).ok(),
            Some(KnowledgeClass::Neutral)
        );
        assert_eq!(
            s.know_of(AgentId(0), Coord::new(0, 2)).ok(),
            Some(KnowledgeClass::Unknown)
        );
        assert!(matches!(
            s.know_of(AgentId(9), Coord::new(0, 0)),
            Err(SimulationError::AgentNotFound(_))
        ));
        assert!(s.knowledge_of(AgentId(1)).is_ok());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let source = "P...F\n..X..\nW..T.";
        let opts = SimulationOptions {
            terrain_modify_step: 5,
            agent_spawn_time: 7,
            ..options()
        };
        let mut a = sim(source, opts.clone());
        let mut b = sim(source, opts);
        for _ in 0..60 {
            assert!(a.step().is_ok());
            assert!(b.step().is_ok());
        }
        assert_eq!(a.get_agents(), b.get_agents());
        assert_eq!(a.get_env(), b.get_env());
        assert_eq!(a.map(), b.map());
        assert_eq!(a.options().total_food, b.options().total_food);
    }
}
