//! Abstract spatial engine contract.
//!
//! The engine stores geometries under opaque handles and answers containment
//! queries. It is a single mutable resource: callers reach it through
//! [`SharedEngine`](super::SharedEngine), never concurrently.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geo::GeoPoint;

/// Engine-assigned reference to a stored geometry.
///
/// Handles are valid when `>= 1`. Polygons and points share one handle space,
/// so a polygon handle can never alias a point handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryHandle(i64);

impl GeometryHandle {
    /// Sentinel for "no geometry".
    pub const INVALID: Self = Self(-1);

    /// Wraps a raw engine handle.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw engine handle.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Returns true when the handle is in the valid range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl Default for GeometryHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for GeometryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage and query backend for fence and entity geometries.
///
/// Rings passed to the polygon operations are closed: the last position
/// repeats the first.
pub trait SpatialEngine: Send {
    /// Store a polygon, returning its handle.
    fn create_polygon(&mut self, ring: &[GeoPoint]) -> Result<GeometryHandle, EngineError>;

    /// Replace the ring of an existing polygon in place.
    fn update_polygon(&mut self, handle: GeometryHandle, ring: &[GeoPoint]) -> Result<(), EngineError>;

    /// Store a point, returning its handle.
    fn create_point(&mut self, point: &GeoPoint) -> Result<GeometryHandle, EngineError>;

    /// Move an existing point in place.
    fn update_point(&mut self, handle: GeometryHandle, point: &GeoPoint) -> Result<(), EngineError>;

    /// Delete any stored geometry.
    fn delete_geometry(&mut self, handle: GeometryHandle) -> Result<(), EngineError>;

    /// Point-in-polygon test between two stored geometries.
    fn contains(&mut self, polygon: GeometryHandle, point: GeometryHandle) -> Result<bool, EngineError>;
}
