//! Fence definitions.
//!
//! A [`GeoFence`] is the non-geometric half of a fence: its identity, name,
//! trigger policy and elevation band. The boundary itself lives in a
//! [`ShapeSource`](crate::shape::ShapeSource).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Unique identifier for a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FenceId(Uuid);

impl FenceId {
    /// Create a new random fence id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for FenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which containment transitions produce alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Alert when an entity is (or becomes) inside.
    #[default]
    Entered,
    /// Alert when an entity is (or becomes) outside.
    Exited,
    /// Alert on either.
    Both,
}

impl fmt::Display for TriggerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entered => write!(f, "entered"),
            Self::Exited => write!(f, "exited"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Altitude band an entity must be within to count as inside.
///
/// Unset bounds are open. A point with unknown altitude is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationRange {
    /// Lowest altitude in metres, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Highest altitude in metres, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ElevationRange {
    /// A range with no bounds.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { min: None, max: None }
    }

    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidElevationRange` if `min > max`.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, ValidationError> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ValidationError::InvalidElevationRange { min: lo, max: hi });
            }
        }
        Ok(Self { min, max })
    }

    /// Returns true if the range has no bounds.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The elevation predicate applied before the spatial containment test.
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let Some(alt) = point.altitude else {
            return true;
        };
        self.min.map_or(true, |lo| alt >= lo) && self.max.map_or(true, |hi| alt <= hi)
    }
}

/// A fence definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    /// Unique identifier.
    #[serde(default)]
    pub id: FenceId,
    /// Display name used in alerts and logs.
    pub name: String,
    /// Policy used by [`FenceMonitor::check_fence`](crate::monitor::FenceMonitor::check_fence).
    #[serde(default)]
    pub trigger: TriggerPolicy,
    /// Elevation band.
    #[serde(default)]
    pub elevation: ElevationRange,
    /// Monitoring radius around the fence center, in kilometres. Unset means
    /// the distance to the furthest vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_km: Option<f64>,
}

impl GeoFence {
    /// Creates a fence with no elevation bounds.
    #[must_use]
    pub fn new(name: impl Into<String>, trigger: TriggerPolicy) -> Self {
        Self {
            id: FenceId::new(),
            name: name.into(),
            trigger,
            elevation: ElevationRange::unbounded(),
            range_km: None,
        }
    }

    /// Sets the elevation band.
    #[must_use]
    pub fn with_elevation(mut self, elevation: ElevationRange) -> Self {
        self.elevation = elevation;
        self
    }

    /// Sets the monitoring radius in kilometres.
    #[must_use]
    pub fn with_range_km(mut self, range_km: f64) -> Self {
        self.range_km = Some(range_km);
        self
    }
}
