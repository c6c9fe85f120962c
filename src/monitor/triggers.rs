//! Trigger decisions and per-entity containment history.

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::fence::TriggerPolicy;

/// History-less decision: alert on the current containment alone.
///
/// `Entered` fires while inside, `Exited` while outside, `Both` every time.
#[must_use]
pub const fn should_alert(policy: TriggerPolicy, inside: bool) -> bool {
    match policy {
        TriggerPolicy::Entered => inside,
        TriggerPolicy::Exited => !inside,
        TriggerPolicy::Both => true,
    }
}

/// Transition decision against the previously recorded containment.
///
/// With no recorded state, `unknown_as_outside` decides whether the entity is
/// taken to have been outside (so a first sighting inside is an entry) or
/// whether no alert can fire until a state exists.
#[must_use]
pub const fn should_alert_transition(
    policy: TriggerPolicy,
    inside: bool,
    previous: Option<bool>,
    unknown_as_outside: bool,
) -> bool {
    let was_inside = match previous {
        Some(prev) => prev,
        None if unknown_as_outside => false,
        None => return false,
    };
    match policy {
        TriggerPolicy::Entered => inside && !was_inside,
        TriggerPolicy::Exited => !inside && was_inside,
        TriggerPolicy::Both => inside != was_inside,
    }
}

/// Last observed containment per entity.
///
/// Absent entries mean "unknown", which is not the same as "outside".
#[derive(Debug, Clone, Default)]
pub struct EntityStateTable {
    states: HashMap<EntityId, bool>,
}

impl EntityStateTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded containment for `id`.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<bool> {
        self.states.get(id).copied()
    }

    /// Record containment, returning the previous value.
    pub fn record(&mut self, id: EntityId, inside: bool) -> Option<bool> {
        self.states.insert(id, inside)
    }

    /// Drop the history of one entity.
    pub fn forget(&mut self, id: &EntityId) -> Option<bool> {
        self.states.remove(id)
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Number of entities with recorded state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true when no state is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
