//! Session Registry
//!
//! Ordered collection of sessions. Order is tab order (insertion order) and
//! only changes through [`SessionRegistry::insert`] and
//! [`SessionRegistry::remove`]; navigation never reorders.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{Session, SessionId};

/// Direction for circular neighbor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the end of the tab strip, wrapping to the start
    Next,
    /// Towards the start of the tab strip, wrapping to the end
    Previous,
}

/// Ordered session collection with O(1) lookup by id
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    /// Tab order
    order: Vec<SessionId>,
    /// Session records keyed by id
    sessions: HashMap<SessionId, Session>,
    /// Ids that were registered once and removed; never accepted again
    retired: HashSet<SessionId>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session at the end of tab order, returning its index
    pub fn insert(&mut self, session: Session) -> Result<usize> {
        let id = session.id;
        if self.sessions.contains_key(&id) || self.retired.contains(&id) {
            return Err(Error::DuplicateSession { id });
        }
        self.order.push(id);
        self.sessions.insert(id, session);
        Ok(self.order.len() - 1)
    }

    /// Remove a session, returning it with its former index
    pub fn remove(&mut self, id: SessionId) -> Result<(Session, usize)> {
        let index = self.index_of(id).ok_or(Error::SessionNotFound { id })?;
        self.order.remove(index);
        let session = self
            .sessions
            .remove(&id)
            .ok_or(Error::SessionNotFound { id })?;
        self.retired.insert(id);
        Ok((session, index))
    }

    /// Look up a session
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Whether the session is registered
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Tab index of a session
    pub fn index_of(&self, id: SessionId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    /// Session id at a tab index
    pub fn id_at(&self, index: usize) -> Option<SessionId> {
        self.order.get(index).copied()
    }

    /// Circular successor or predecessor of a session
    ///
    /// `None` when the registry is empty or `id` is not registered. In a
    /// single-session registry a session is its own neighbor.
    pub fn neighbor_of(&self, id: SessionId, direction: Direction) -> Option<SessionId> {
        let count = self.order.len();
        let index = self.index_of(id)?;
        let neighbor = match direction {
            Direction::Next => (index + 1) % count,
            Direction::Previous => (index + count - 1) % count,
        };
        self.id_at(neighbor)
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Session ids in tab order
    pub fn ids(&self) -> &[SessionId] {
        &self.order
    }

    /// Sessions in tab order
    pub fn iter(&self) -> impl Iterator<Item = &Session> + '_ {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }
}
