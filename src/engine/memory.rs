//! In-memory spatial engine.
//!
//! A reference backend for embedded use and tests. Containment is a planar
//! ray-casting test in (longitude, latitude) space, which is adequate for
//! fences a few kilometres across. Points on the boundary count as inside.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::EngineError;
use crate::geo::GeoPoint;

use super::traits::{GeometryHandle, SpatialEngine};

/// Minimum positions in a stored ring: three vertices plus the closing vertex.
const MIN_RING_LEN: usize = 4;

/// Tolerance (degrees) for "on the boundary" and ring closure checks.
const EPSILON_DEG: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Geometry {
    Polygon(Vec<GeoPoint>),
    Point(GeoPoint),
}

/// Call counters for an engine, readable while the engine is shared.
#[allow(missing_docs)]
#[derive(Debug, Default)]
pub struct EngineStats {
    pub polygons_created: AtomicU64,
    pub polygons_updated: AtomicU64,
    pub points_created: AtomicU64,
    pub points_updated: AtomicU64,
    pub geometries_deleted: AtomicU64,
    pub contains_calls: AtomicU64,
    pub live_geometries: AtomicU64,
}

/// Plain copy of [`EngineStats`] at one instant.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub polygons_created: u64,
    pub polygons_updated: u64,
    pub points_created: u64,
    pub points_updated: u64,
    pub geometries_deleted: u64,
    pub contains_calls: u64,
    pub live_geometries: u64,
}

impl EngineStats {
    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            polygons_created: self.polygons_created.load(Ordering::Relaxed),
            polygons_updated: self.polygons_updated.load(Ordering::Relaxed),
            points_created: self.points_created.load(Ordering::Relaxed),
            points_updated: self.points_updated.load(Ordering::Relaxed),
            geometries_deleted: self.geometries_deleted.load(Ordering::Relaxed),
            contains_calls: self.contains_calls.load(Ordering::Relaxed),
            live_geometries: self.live_geometries.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn validate_ring(ring: &[GeoPoint]) -> Result<(), EngineError> {
    if ring.len() < MIN_RING_LEN {
        return Err(EngineError::rejected(format!(
            "ring needs at least {MIN_RING_LEN} positions, got {}",
            ring.len()
        )));
    }
    let (first, last) = (&ring[0], &ring[ring.len() - 1]);
    if (first.latitude - last.latitude).abs() > EPSILON_DEG
        || (first.longitude - last.longitude).abs() > EPSILON_DEG
    {
        return Err(EngineError::rejected("ring is not closed"));
    }
    if ring
        .iter()
        .any(|p| !p.latitude.is_finite() || !p.longitude.is_finite())
    {
        return Err(EngineError::rejected("ring has non-finite coordinates"));
    }
    Ok(())
}

fn on_segment(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> bool {
    let (px, py) = (p.longitude, p.latitude);
    let (ax, ay) = (a.longitude, a.latitude);
    let (bx, by) = (b.longitude, b.latitude);

    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross.abs() > EPSILON_DEG {
        return false;
    }
    px >= ax.min(bx) - EPSILON_DEG
        && px <= ax.max(bx) + EPSILON_DEG
        && py >= ay.min(by) - EPSILON_DEG
        && py <= ay.max(by) + EPSILON_DEG
}

/// Even-odd ray casting over a closed ring.
fn ring_contains(ring: &[GeoPoint], p: &GeoPoint) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let (a, b) = (&edge[0], &edge[1]);
        if on_segment(p, a, b) {
            return true;
        }
        if (a.latitude > p.latitude) != (b.latitude > p.latitude) {
            let x_cross = a.longitude
                + (p.latitude - a.latitude) * (b.longitude - a.longitude) / (b.latitude - a.latitude);
            if p.longitude < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Single-threaded in-memory engine; share it through `SharedEngine`.
#[derive(Debug)]
pub struct InMemorySpatialEngine {
    geometries: HashMap<GeometryHandle, Geometry>,
    next_handle: i64,
    stats: Arc<EngineStats>,
}

impl Default for InMemorySpatialEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySpatialEngine {
    /// Create a new empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            geometries: HashMap::new(),
            next_handle: 1,
            stats: Arc::new(EngineStats::default()),
        }
    }

    /// Counters that stay readable after the engine is moved into a `SharedEngine`.
    #[must_use]
    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Number of stored geometries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    fn insert(&mut self, geometry: Geometry) -> GeometryHandle {
        let handle = GeometryHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.geometries.insert(handle, geometry);
        bump(&self.stats.live_geometries);
        handle
    }

    fn get_mut(&mut self, handle: GeometryHandle) -> Result<&mut Geometry, EngineError> {
        self.geometries
            .get_mut(&handle)
            .ok_or(EngineError::UnknownHandle { handle })
    }
}

impl SpatialEngine for InMemorySpatialEngine {
    fn create_polygon(&mut self, ring: &[GeoPoint]) -> Result<GeometryHandle, EngineError> {
        validate_ring(ring)?;
        bump(&self.stats.polygons_created);
        Ok(self.insert(Geometry::Polygon(ring.to_vec())))
    }

    fn update_polygon(&mut self, handle: GeometryHandle, ring: &[GeoPoint]) -> Result<(), EngineError> {
        validate_ring(ring)?;
        match self.get_mut(handle)? {
            Geometry::Polygon(stored) => {
                stored.clear();
                stored.extend_from_slice(ring);
            }
            Geometry::Point(_) => {
                return Err(EngineError::WrongKind {
                    handle,
                    expected: "polygon",
                })
            }
        }
        bump(&self.stats.polygons_updated);
        Ok(())
    }

    fn create_point(&mut self, point: &GeoPoint) -> Result<GeometryHandle, EngineError> {
        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            return Err(EngineError::rejected("point has non-finite coordinates"));
        }
        bump(&self.stats.points_created);
        Ok(self.insert(Geometry::Point(*point)))
    }

    fn update_point(&mut self, handle: GeometryHandle, point: &GeoPoint) -> Result<(), EngineError> {
        match self.get_mut(handle)? {
            Geometry::Point(stored) => *stored = *point,
            Geometry::Polygon(_) => {
                return Err(EngineError::WrongKind {
                    handle,
                    expected: "point",
                })
            }
        }
        bump(&self.stats.points_updated);
        Ok(())
    }

    fn delete_geometry(&mut self, handle: GeometryHandle) -> Result<(), EngineError> {
        self.geometries
            .remove(&handle)
            .ok_or(EngineError::UnknownHandle { handle })?;
        bump(&self.stats.geometries_deleted);
        self.stats.live_geometries.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    fn contains(&mut self, polygon: GeometryHandle, point: GeometryHandle) -> Result<bool, EngineError> {
        bump(&self.stats.contains_calls);
        let Some(Geometry::Polygon(ring)) = self.geometries.get(&polygon) else {
            return Err(match self.geometries.get(&polygon) {
                None => EngineError::UnknownHandle { handle: polygon },
                Some(_) => EngineError::WrongKind {
                    handle: polygon,
                    expected: "polygon",
                },
            });
        };
        match self.geometries.get(&point) {
            Some(Geometry::Point(p)) => Ok(ring_contains(ring, p)),
            Some(Geometry::Polygon(_)) => Err(EngineError::WrongKind {
                handle: point,
                expected: "point",
            }),
            None => Err(EngineError::UnknownHandle { handle: point }),
        }
    }
}
