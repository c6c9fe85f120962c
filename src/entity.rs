//! Monitored entity identity and position.
//!
//! An entity is anything with a location that a fence watches: a unit, a
//! vehicle, a sensor track. Only its identity is stable; its location is
//! re-read on every check cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Globally unique, stable entity identifier.
///
/// # Examples
///
/// ```
/// use kyrofence::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derives a stable ID from an external string UID (e.g. a track UID
    /// coming from a feed that does not use UUIDs).
    #[must_use]
    pub fn from_external_uid(uid: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, uid.as_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// An entity as seen at the start of a check cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredEntity {
    /// Stable identity.
    pub id: EntityId,
    /// Human readable name used in alerts and logs.
    pub callsign: String,
    /// Current location; `None` when the feed has no fix.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl MonitoredEntity {
    /// Creates an entity with a fresh ID and no location.
    #[must_use]
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            callsign: callsign.into(),
            location: None,
        }
    }

    /// Creates an entity with a known ID and location.
    #[must_use]
    pub fn at(id: EntityId, callsign: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id,
            callsign: callsign.into(),
            location: Some(location),
        }
    }

    /// Returns a copy moved to `location`.
    #[must_use]
    pub fn moved_to(&self, location: GeoPoint) -> Self {
        Self {
            location: Some(location),
            ..self.clone()
        }
    }
}
