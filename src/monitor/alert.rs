//! Alerts produced by a check cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::fence::FenceId;
use crate::geo::GeoPoint;

/// Direction an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The entity is inside the fence.
    Entered,
    /// The entity is outside the fence.
    Exited,
}

/// A fired fence alert. Immutable once produced.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub monitor_id: FenceId,
    pub fence_name: String,
    pub entity_id: EntityId,
    pub callsign: String,
    /// Shared by every alert of one check cycle.
    pub timestamp: DateTime<Utc>,
    /// Entity location as seen by the cycle that fired.
    pub location: GeoPoint,
    pub inside: bool,
}

impl Alert {
    /// Entered or exited, from the inside flag.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        if self.inside {
            AlertKind::Entered
        } else {
            AlertKind::Exited
        }
    }
}
