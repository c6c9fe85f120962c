//! Per-fence cache of entity point geometries.
//!
//! Creating or moving a point in the spatial engine costs far more than a
//! distance comparison, so a point is only moved once its entity has travelled
//! at least the movement threshold. Below that, containment keeps using the
//! previously registered point.
//!
//! Entries live until [`PointTracker::remove`] or [`PointTracker::release_all`];
//! the tracker never notices on its own that an entity has disappeared.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::engine::{GeometryHandle, SharedEngine};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::geo::GeoPoint;

/// A cached entity point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    /// Location last written to the engine.
    pub location: GeoPoint,
    /// Engine handle of the point geometry.
    pub handle: GeometryHandle,
}

/// What `observe` did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveAction {
    /// First sighting: a point geometry was created.
    Created,
    /// Moved past the threshold: the point geometry was updated.
    Moved,
    /// Sub-threshold movement: no engine call.
    Reused,
}

/// Result of a successful observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Handle to test containment against.
    pub handle: GeometryHandle,
    /// Engine work performed.
    pub action: ObserveAction,
}

/// Entity identity to engine point, with movement suppression.
#[derive(Debug)]
pub struct PointTracker {
    engine: SharedEngine,
    threshold_m: f64,
    points: HashMap<EntityId, TrackedPoint>,
}

impl PointTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(engine: SharedEngine, threshold_m: f64) -> Self {
        Self {
            engine,
            threshold_m,
            points: HashMap::new(),
        }
    }

    /// Register or refresh the point for `id`.
    ///
    /// # Errors
    ///
    /// Returns the engine error when the point cannot be created or moved.
    /// A failed move drops the cache entry so the next sighting starts over.
    pub fn observe(&mut self, id: EntityId, location: GeoPoint) -> Result<Observation, EngineError> {
        let Some(cached) = self.points.get(&id).copied() else {
            let handle = self.engine.create_point(&location)?;
            if !handle.is_valid() {
                return Err(EngineError::rejected(format!("engine returned invalid point handle {handle}")));
            }
            self.points.insert(id, TrackedPoint { location, handle });
            return Ok(Observation {
                handle,
                action: ObserveAction::Created,
            });
        };

        let moved = cached.location.distance_to(&location);
        if moved < self.threshold_m {
            return Ok(Observation {
                handle: cached.handle,
                action: ObserveAction::Reused,
            });
        }

        if let Err(err) = self.engine.update_point(cached.handle, &location) {
            warn!(entity = %id, handle = %cached.handle, error = %err, "failed to move tracked point, dropping it");
            self.discard(id, cached.handle);
            return Err(err);
        }
        self.points.insert(
            id,
            TrackedPoint {
                location,
                handle: cached.handle,
            },
        );
        Ok(Observation {
            handle: cached.handle,
            action: ObserveAction::Moved,
        })
    }

    /// Stop tracking `id` and delete its point, best-effort.
    ///
    /// Returns true if the entity was tracked.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        let Some(tracked) = self.points.get(id).copied() else {
            return false;
        };
        self.discard(*id, tracked.handle);
        true
    }

    /// Drop the cache entry for `id` without touching the engine.
    ///
    /// Used when the engine no longer knows the cached handle. Returns true if
    /// the entity was tracked.
    pub fn forget(&mut self, id: &EntityId) -> bool {
        let forgotten = self.points.remove(id).is_some();
        if forgotten {
            debug!(entity = %id, "forgot stale tracked point");
        }
        forgotten
    }

    /// Delete every tracked point, best-effort, and empty the cache.
    pub fn release_all(&mut self) {
        let count = self.points.len();
        for (id, tracked) in self.points.drain() {
            if let Err(err) = self.engine.delete_geometry(tracked.handle) {
                warn!(entity = %id, handle = %tracked.handle, error = %err, "failed to delete tracked point");
            }
        }
        debug!(count, "released tracked points");
    }

    /// Cached entry for `id`.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&TrackedPoint> {
        self.points.get(id)
    }

    /// Tracked entity ids, in no particular order.
    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.points.keys()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn discard(&mut self, id: EntityId, handle: GeometryHandle) {
        self.points.remove(&id);
        if let Err(err) = self.engine.delete_geometry(handle) {
            warn!(entity = %id, %handle, error = %err, "failed to remove entity from spatial engine");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{EngineStats, InMemorySpatialEngine};

    fn tracker() -> (PointTracker, Arc<EngineStats>) {
        let mem = InMemorySpatialEngine::new();
        let stats = mem.stats();
        (PointTracker::new(SharedEngine::new(mem), 2.0), stats)
    }

    #[test]
    fn test_first_sighting_creates_point() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        let obs = tracker.observe(id, GeoPoint::from_degrees(10.0, 10.0)).unwrap();
        assert_eq!(obs.action, ObserveAction::Created);
        assert!(obs.handle.is_valid());
        assert_eq!(tracker.get(&id).unwrap().handle, obs.handle);
        assert_eq!(stats.snapshot().points_created, 1);
    }

    #[test]
    fn test_sub_threshold_move_makes_no_engine_call() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        let start = GeoPoint::from_degrees(10.0, 10.0);
        let first = tracker.observe(id, start).unwrap();

        let nudged = start.offset_meters(1.5, 0.0);
        let obs = tracker.observe(id, nudged).unwrap();
        assert_eq!(obs.action, ObserveAction::Reused);
        assert_eq!(obs.handle, first.handle);
        assert_eq!(tracker.get(&id).unwrap().location, start, "cached location is not refreshed");
        assert_eq!(stats.snapshot().points_updated, 0);
    }

    #[test]
    fn test_threshold_move_updates_in_place() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        let start = GeoPoint::from_degrees(10.0, 10.0);
        let first = tracker.observe(id, start).unwrap();

        let far = start.offset_meters(5.0, 0.0);
        let obs = tracker.observe(id, far).unwrap();
        assert_eq!(obs.action, ObserveAction::Moved);
        assert_eq!(obs.handle, first.handle);
        assert_eq!(tracker.get(&id).unwrap().location, far);
        assert_eq!(stats.snapshot().points_updated, 1);
        assert_eq!(stats.snapshot().points_created, 1);
    }

    #[test]
    fn test_move_of_exactly_threshold_updates() {
        let start = GeoPoint::from_degrees(10.0, 10.0);
        let target = start.offset_meters(2.0, 0.0);
        let threshold = start.distance_to(&target);

        let mem = InMemorySpatialEngine::new();
        let stats = mem.stats();
        let mut tracker = PointTracker::new(SharedEngine::new(mem), threshold);
        let id = EntityId::new();
        tracker.observe(id, start).unwrap();

        let just_short = start.offset_meters(1.99, 0.0);
        assert!(start.distance_to(&just_short) < threshold);
        assert_eq!(tracker.observe(id, just_short).unwrap().action, ObserveAction::Reused);
        assert_eq!(stats.snapshot().points_updated, 0);

        assert_eq!(tracker.observe(id, target).unwrap().action, ObserveAction::Moved);
        assert_eq!(stats.snapshot().points_updated, 1);
    }

    #[test]
    fn test_forget_drops_entry_without_engine_call() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        tracker.observe(id, GeoPoint::from_degrees(10.0, 10.0)).unwrap();

        assert!(tracker.forget(&id));
        assert!(!tracker.forget(&id));
        assert!(tracker.get(&id).is_none());
        assert_eq!(stats.snapshot().geometries_deleted, 0);
    }

    #[test]
    fn test_small_moves_accumulate_against_cached_location() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        let start = GeoPoint::from_degrees(10.0, 10.0);
        tracker.observe(id, start).unwrap();

        tracker.observe(id, start.offset_meters(1.0, 0.0)).unwrap();
        let obs = tracker.observe(id, start.offset_meters(2.5, 0.0)).unwrap();
        assert_eq!(obs.action, ObserveAction::Moved);
        assert_eq!(stats.snapshot().points_updated, 1);
    }

    #[test]
    fn test_remove_deletes_and_reobserve_creates_new_handle() {
        let (mut tracker, stats) = tracker();
        let id = EntityId::new();
        let p = GeoPoint::from_degrees(10.0, 10.0);
        let first = tracker.observe(id, p).unwrap();

        assert!(tracker.remove(&id));
        assert!(!tracker.remove(&id));
        assert!(tracker.is_empty());
        assert_eq!(stats.snapshot().live_geometries, 0);

        let again = tracker.observe(id, p).unwrap();
        assert_eq!(again.action, ObserveAction::Created);
        assert_ne!(again.handle, first.handle);
    }

    #[test]
    fn test_failed_move_drops_stale_entry() {
        let mem = InMemorySpatialEngine::new();
        let shared = SharedEngine::new(mem);
        let mut tracker = PointTracker::new(shared.clone(), 2.0);
        let id = EntityId::new();
        let p = GeoPoint::from_degrees(10.0, 10.0);
        let first = tracker.observe(id, p).unwrap();

        // Something else deleted the geometry behind the tracker's back.
        shared.delete_geometry(first.handle).unwrap();
        let err = tracker.observe(id, p.offset_meters(10.0, 0.0)).unwrap_err();
        assert!(matches!(err, EngineError::UnknownHandle { .. }));
        assert!(tracker.get(&id).is_none());

        let recovered = tracker.observe(id, p).unwrap();
        assert_eq!(recovered.action, ObserveAction::Created);
    }

    #[test]
    fn test_release_all() {
        let (mut tracker, stats) = tracker();
        for i in 0..4 {
            tracker
                .observe(EntityId::new(), GeoPoint::from_degrees(f64::from(i), 0.0))
                .unwrap();
        }
        assert_eq!(tracker.len(), 4);
        assert_eq!(tracker.entity_ids().count(), 4);
        tracker.release_all();
        assert!(tracker.is_empty());
        assert_eq!(stats.snapshot().live_geometries, 0);
    }
}
