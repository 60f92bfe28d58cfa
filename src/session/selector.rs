//! Active-Session Selector
//!
//! State machine over `{ none, active(id) }`. The active id always refers to
//! a registered session; removal of the active session reassigns it in the
//! same step, so the pointer never dangles.

use serde::{Deserialize, Serialize};

use super::registry::{Direction, SessionRegistry};
use crate::error::{Error, Result};
use crate::models::SessionId;

/// A change of the active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChange {
    /// Previously active session
    pub previous: Option<SessionId>,
    /// Newly active session, `None` when the registry became empty
    pub current: Option<SessionId>,
}

/// Tracks which session is active
#[derive(Debug, Clone, Default)]
pub struct ActiveSelector {
    active: Option<SessionId>,
}

impl ActiveSelector {
    /// Selector with no active session
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active session
    pub fn active(&self) -> Option<SessionId> {
        self.active
    }

    /// Tab index of the active session
    pub fn active_index(&self, registry: &SessionRegistry) -> Option<usize> {
        self.active.and_then(|id| registry.index_of(id))
    }

    /// Make `id` the active session
    ///
    /// Returns `Ok(None)` when `id` is already active.
    pub fn activate(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
    ) -> Result<Option<ActiveChange>> {
        if !registry.contains(id) {
            return Err(Error::SessionNotFound { id });
        }
        if self.active == Some(id) {
            return Ok(None);
        }
        Ok(Some(self.switch(registry, Some(id))))
    }

    /// Activate the session at a tab index
    pub fn activate_index(
        &mut self,
        registry: &mut SessionRegistry,
        index: usize,
    ) -> Option<ActiveChange> {
        let id = registry.id_at(index)?;
        self.activate(registry, id).ok().flatten()
    }

    /// Reassign the active pointer after `removed` left the registry
    ///
    /// Must be called in the same step as the removal. The replacement is
    /// the session now at the removed index, clamped to the last tab.
    pub fn on_removed(
        &mut self,
        registry: &mut SessionRegistry,
        removed: SessionId,
        index: usize,
    ) -> Option<ActiveChange> {
        if self.active != Some(removed) {
            return None;
        }
        let replacement = if registry.is_empty() {
            None
        } else {
            registry.id_at(index.min(registry.len() - 1))
        };
        Some(self.switch(registry, replacement))
    }

    /// Activate the next tab, wrapping around
    pub fn next(&mut self, registry: &mut SessionRegistry) -> Option<ActiveChange> {
        self.step(registry, Direction::Next)
    }

    /// Activate the previous tab, wrapping around
    pub fn previous(&mut self, registry: &mut SessionRegistry) -> Option<ActiveChange> {
        self.step(registry, Direction::Previous)
    }

    fn step(
        &mut self,
        registry: &mut SessionRegistry,
        direction: Direction,
    ) -> Option<ActiveChange> {
        let count = registry.len();
        if count <= 1 {
            return None;
        }
        let target = match self.active {
            Some(id) => registry.neighbor_of(id, direction)?,
            // No active session counts as index -1
            None => match direction {
                Direction::Next => registry.id_at(0)?,
                Direction::Previous => registry.id_at(count - 1)?,
            },
        };
        self.activate(registry, target).ok().flatten()
    }

    fn switch(&mut self, registry: &mut SessionRegistry, next: Option<SessionId>) -> ActiveChange {
        let previous = self.active;
        if let Some(session) = previous.and_then(|id| registry.get_mut(id)) {
            session.focused = false;
        }
        if let Some(session) = next.and_then(|id| registry.get_mut(id)) {
            session.focused = true;
        }
        self.active = next;
        ActiveChange {
            previous,
            current: next,
        }
    }
}
