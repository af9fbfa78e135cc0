//! Ownership of agent knowledge.
//!
//! A run either gives every agent a private [`Knowledge`] or makes the whole
//! population read and write one common instance. The choice is made once,
//! when the bank is created, and never mixed.

use std::collections::BTreeMap;

use forage_types::AgentId;
use forage_world::Knowledge;

use crate::error::AgentError;

/// Where each agent's knowledge lives.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeBank {
    /// One knowledge per agent, keyed by id.
    Private(BTreeMap<AgentId, Knowledge>),
    /// A single knowledge shared by every agent.
    Common(Knowledge),
}

impl KnowledgeBank {
    /// An empty bank in the requested mode.
    pub fn new(common: bool) -> Self {
        if common {
            Self::Common(Knowledge::new())
        } else {
            Self::Private(BTreeMap::new())
        }
    }

    /// Whether all agents share one knowledge.
    pub const fn is_common(&self) -> bool {
        matches!(self, Self::Common(_))
    }

    /// Give a newly spawned agent its knowledge and return it.
    ///
    /// In private mode the agent starts with a fresh knowledge; in common
    /// mode it joins the population's.
    pub fn register(&mut self, id: AgentId) -> &mut Knowledge {
        match self {
            Self::Private(books) => books.entry(id).or_default(),
            Self::Common(shared) => shared,
        }
    }

    /// Drop a dead agent's private knowledge. Common knowledge outlives
    /// every agent, so nothing is returned in that mode.
    pub fn release(&mut self, id: AgentId) -> Option<Knowledge> {
        match self {
            Self::Private(books) => books.remove(&id),
            Self::Common(_) => None,
        }
    }

    /// Knowledge the agent reads.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::KnowledgeMissing`] for an unregistered agent in
    /// private mode.
    pub fn get(&self, id: AgentId) -> Result<&Knowledge, AgentError> {
        match self {
            Self::Private(books) => books.get(&id).ok_or(AgentError::KnowledgeMissing(id)),
            Self::Common(shared) => Ok(shared),
        }
    }

    /// Knowledge the agent writes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::KnowledgeMissing`] for an unregistered agent in
    /// private mode.
    pub fn get_mut(&mut self, id: AgentId) -> Result<&mut Knowledge, AgentError> {
        match self {
            Self::Private(books) => books
                .get_mut(&id)
                .ok_or(AgentError::KnowledgeMissing(id)),
            Self::Common(shared) => Ok(shared),
        }
    }

    /// Run `exchange` with the sharer's knowledge borrowed immutably and the
    /// peer's mutably.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CommonKnowledge`] in common mode and
    /// [`AgentError::KnowledgeMissing`] if either agent is unregistered or
    /// both ids are the same.
    pub fn with_pair<T>(
        &mut self,
        sharer: AgentId,
        peer: AgentId,
        exchange: impl FnOnce(&Knowledge, &mut Knowledge) -> T,
    ) -> Result<T, AgentError> {
        let Self::Private(books) = self else {
            return Err(AgentError::CommonKnowledge);
        };
        let mut peer_knowledge = books
            .remove(&peer)
            .ok_or(AgentError::KnowledgeMissing(peer))?;
        let result = books
            .get(&sharer)
            .map(|own| exchange(own, &mut peer_knowledge))
            .ok_or(AgentError::KnowledgeMissing(sharer));
        books.insert(peer, peer_knowledge);
        result
    }
}
