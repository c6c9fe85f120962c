//! The fence monitor: one polygon, many tracked entities.
//!
//! A check cycle drains pending shape changes, then for every entity refreshes
//! its tracked point, tests containment and evaluates the trigger. Failures are
//! logged and absorbed per entity; `check` always returns a (possibly empty)
//! list of alerts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::engine::SharedEngine;
use crate::entity::{EntityId, MonitoredEntity};
use crate::error::{FenceError, FenceResult};
use crate::fence::{FenceId, GeoFence, TriggerPolicy};
use crate::geo::GeoPoint;
use crate::shape::{ShapeSource, ShapeSubscription};

use super::alert::Alert;
use super::registry::{PolygonRegistry, RebuildOutcome};
use super::tracker::PointTracker;
use super::triggers::{should_alert, should_alert_transition, EntityStateTable};

/// Lifecycle state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// The fence polygon is registered and checks run.
    Valid,
    /// The polygon is gone; checks return nothing until the monitor is rebuilt.
    Invalid,
}

/// Everything a check cycle mutates, guarded by one per-monitor lock.
#[derive(Debug)]
struct Inner {
    registry: PolygonRegistry,
    tracker: PointTracker,
    states: EntityStateTable,
    dismissed: HashSet<EntityId>,
    subscription: Option<ShapeSubscription>,
}

/// Monitors a set of entities against one closed-shape fence.
///
/// Dropping a monitor disconnects its shape subscription; the shape prunes it
/// on the next edit. Call [`dispose`](Self::dispose) to also free the engine
/// geometries.
pub struct FenceMonitor {
    fence: GeoFence,
    shape: Arc<dyn ShapeSource>,
    engine: SharedEngine,
    config: MonitorConfig,
    inner: Mutex<Inner>,
}

impl FenceMonitor {
    /// Register the shape's polygon and start listening for edits.
    ///
    /// A shape with fewer than three points, or one the engine rejects,
    /// produces a monitor that is invalid from the start.
    pub fn new(fence: GeoFence, shape: Arc<dyn ShapeSource>, engine: SharedEngine, config: MonitorConfig) -> Self {
        let registry = PolygonRegistry::create(engine.clone(), &shape.points(), fence.name.clone());
        let subscription = registry
            .is_valid()
            .then(|| shape.subscribe(config.event_queue_capacity));
        let tracker = PointTracker::new(engine.clone(), config.movement_threshold_m);

        Self {
            fence,
            shape,
            engine,
            config,
            inner: Mutex::new(Inner {
                registry,
                tracker,
                states: EntityStateTable::new(),
                dismissed: HashSet::new(),
                subscription,
            }),
        }
    }

    /// Id of the monitored fence.
    #[must_use]
    pub const fn id(&self) -> FenceId {
        self.fence.id
    }

    /// The fence definition.
    #[must_use]
    pub const fn fence(&self) -> &GeoFence {
        &self.fence
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Apply pending shape edits, then report whether the fence is usable.
    pub fn is_valid(&self) -> bool {
        self.state() == MonitorState::Valid
    }

    /// Apply pending shape edits, then report the lifecycle state.
    pub fn state(&self) -> MonitorState {
        let Some(mut inner) = self.lock("state") else {
            return MonitorState::Invalid;
        };
        self.sync_locked(&mut *inner);
        if inner.registry.is_valid() {
            MonitorState::Valid
        } else {
            MonitorState::Invalid
        }
    }

    /// Drain pending shape change events and rebuild the polygon if needed.
    pub fn sync_shape(&self) -> RebuildOutcome {
        match self.lock("sync_shape") {
            Some(mut inner) => self.sync_locked(&mut *inner),
            None => RebuildOutcome::Unchanged,
        }
    }

    /// Run one check cycle with the fence's own policy, comparing to history.
    pub fn check_fence(&self, entities: &[MonitoredEntity]) -> Vec<Alert> {
        self.check(self.fence.trigger, entities, true)
    }

    /// Run one check cycle.
    ///
    /// With `compare_to_previous`, alerts fire only on transitions matching
    /// `policy` and each entity's containment is recorded. Without it, the
    /// decision uses current containment alone and no history is touched.
    pub fn check(&self, policy: TriggerPolicy, entities: &[MonitoredEntity], compare_to_previous: bool) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let Some(mut inner) = self.lock("check") else {
            return alerts;
        };
        self.sync_locked(&mut *inner);

        if entities.is_empty() {
            debug!(fence = %self.fence.name, "no entities to track");
            return alerts;
        }
        if !inner.registry.is_valid() {
            warn!(fence = %self.fence.name, "fence polygon not available, skipping check");
            return alerts;
        }

        let timestamp = Utc::now();
        let anchor = self.shape.anchor_entity();

        for entity in entities {
            if Some(entity.id) == anchor || inner.dismissed.contains(&entity.id) {
                continue;
            }

            match self.check_entity(&mut *inner, entity, policy, compare_to_previous, timestamp) {
                Ok(Some(alert)) => alerts.push(alert),
                Ok(None) => {}
                Err(err) if err.is_severe() => {
                    error!(fence = %self.fence.name, entity = %entity.id, error = %err, "error while monitoring");
                }
                Err(err) => {
                    warn!(fence = %self.fence.name, entity = %entity.id, error = %err, "skipping entity this cycle");
                }
            }
        }

        alerts
    }

    fn check_entity(
        &self,
        inner: &mut Inner,
        entity: &MonitoredEntity,
        policy: TriggerPolicy,
        compare_to_previous: bool,
        timestamp: DateTime<Utc>,
    ) -> FenceResult<Option<Alert>> {
        let location = entity
            .location
            .ok_or(FenceError::MissingLocation { id: entity.id })?;

        let observation = inner.tracker.observe(entity.id, location)?;

        let inside = self.fence.elevation.contains(&location)
            && match self.engine.contains(inner.registry.handle(), observation.handle) {
                Ok(inside) => inside,
                Err(err) => {
                    if err.handle() == Some(observation.handle) {
                        // The cached point is gone from the engine; the next
                        // sighting registers a fresh one.
                        inner.tracker.forget(&entity.id);
                    }
                    return Err(err.into());
                }
            };

        let fire = if compare_to_previous {
            let previous = inner.states.record(entity.id, inside);
            should_alert_transition(policy, inside, previous, self.config.treat_unknown_as_outside)
        } else {
            should_alert(policy, inside)
        };

        Ok(fire.then(|| Alert {
            alert_id: Uuid::new_v4(),
            monitor_id: self.fence.id,
            fence_name: self.fence.name.clone(),
            entity_id: entity.id,
            callsign: entity.callsign.clone(),
            timestamp,
            location,
            inside,
        }))
    }

    /// Stop monitoring an entity: delete its point, forget its history and
    /// any dismissal. Returns true if the entity had a tracked point.
    pub fn remove_entity(&self, id: &EntityId) -> bool {
        let Some(mut inner) = self.lock("remove_entity") else {
            return false;
        };
        let removed = inner.tracker.remove(id);
        inner.states.forget(id);
        inner.dismissed.remove(id);
        removed
    }

    /// Exclude an entity from future cycles until undismissed.
    pub fn dismiss(&self, id: EntityId) {
        if let Some(mut inner) = self.lock("dismiss") {
            inner.dismissed.insert(id);
        }
    }

    /// Include a previously dismissed entity again.
    pub fn undismiss(&self, id: &EntityId) {
        if let Some(mut inner) = self.lock("undismiss") {
            inner.dismissed.remove(id);
        }
    }

    /// Returns true if the entity is dismissed.
    pub fn is_dismissed(&self, id: &EntityId) -> bool {
        self.lock("is_dismissed")
            .is_some_and(|inner| inner.dismissed.contains(id))
    }

    /// Containment recorded by the last history-mode cycle.
    pub fn last_state(&self, id: &EntityId) -> Option<bool> {
        self.lock("last_state").and_then(|inner| inner.states.get(id))
    }

    /// Number of entities with a tracked point.
    pub fn tracked_count(&self) -> usize {
        self.lock("tracked_count")
            .map_or(0, |inner| inner.tracker.len())
    }

    /// Reference point of the fence.
    #[must_use]
    pub fn center(&self) -> Option<GeoPoint> {
        self.shape.center()
    }

    /// Distance in metres from the center to the furthest vertex.
    #[must_use]
    pub fn furthest_point_range(&self) -> f64 {
        let Some(center) = self.shape.center() else {
            return 0.0;
        };
        self.shape
            .points()
            .iter()
            .map(|p| center.distance_to(p))
            .fold(0.0, f64::max)
    }

    /// Monitoring radius in metres: the fence's configured range, or the
    /// furthest vertex distance when none is set.
    #[must_use]
    pub fn monitoring_range_m(&self) -> f64 {
        self.fence
            .range_km
            .map_or_else(|| self.furthest_point_range(), |km| km * 1_000.0)
    }

    /// Unsubscribe from the shape and free every engine geometry this
    /// monitor owns. The monitor is invalid afterwards.
    pub fn dispose(&self) {
        let Some(mut inner) = self.lock("dispose") else {
            return;
        };
        if let Some(sub) = inner.subscription.take() {
            self.shape.unsubscribe(sub.id());
        }
        inner.tracker.release_all();
        inner.registry.release();
        inner.states.clear();
        inner.dismissed.clear();
        debug!(fence = %self.fence.name, "monitor disposed");
    }

    fn sync_locked(&self, inner: &mut Inner) -> RebuildOutcome {
        let Inner {
            registry,
            subscription,
            ..
        } = inner;
        let Some(sub) = subscription.as_ref() else {
            return RebuildOutcome::Unchanged;
        };
        let outcome = registry.drain_changes(sub, self.shape.as_ref());
        if outcome == RebuildOutcome::Invalidated {
            // Invalid is terminal: later edits are not worth listening to.
            if let Some(sub) = subscription.take() {
                self.shape.unsubscribe(sub.id());
            }
        }
        outcome
    }

    fn lock(&self, context: &'static str) -> Option<MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                error!(fence = %self.fence.name, context, "monitor state lock poisoned");
                None
            }
        }
    }
}

impl std::fmt::Debug for FenceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FenceMonitor")
            .field("fence", &self.fence)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemorySpatialEngine;
    use crate::shape::DrawingShape;

    fn origin() -> GeoPoint {
        GeoPoint::from_degrees(38.0, -77.0)
    }

    fn square_shape() -> Arc<DrawingShape> {
        let o = origin();
        Arc::new(DrawingShape::closed(vec![
            o,
            o.offset_meters(0.0, 100.0),
            o.offset_meters(100.0, 100.0),
            o.offset_meters(100.0, 0.0),
        ]))
    }

    fn monitor(shape: Arc<DrawingShape>) -> FenceMonitor {
        FenceMonitor::new(
            GeoFence::new("square", TriggerPolicy::Entered),
            shape,
            SharedEngine::new(InMemorySpatialEngine::new()),
            MonitorConfig::default(),
        )
    }

    #[test]
    fn test_history_less_check_never_records_state() {
        let m = monitor(square_shape());
        let e = MonitoredEntity::at(EntityId::new(), "A", origin().offset_meters(50.0, 50.0));

        for _ in 0..2 {
            let alerts = m.check(TriggerPolicy::Entered, std::slice::from_ref(&e), false);
            assert_eq!(alerts.len(), 1);
        }
        assert_eq!(m.last_state(&e.id), None);
    }

    #[test]
    fn test_anchor_and_dismissed_are_skipped() {
        let shape = square_shape();
        let anchor = MonitoredEntity::at(EntityId::new(), "CENTER", origin().offset_meters(50.0, 50.0));
        shape.set_anchor(Some(anchor.id));
        let m = monitor(shape);

        let other = MonitoredEntity::at(EntityId::new(), "B", origin().offset_meters(10.0, 10.0));
        m.dismiss(other.id);
        assert!(m.is_dismissed(&other.id));

        let alerts = m.check(TriggerPolicy::Entered, &[anchor, other.clone()], false);
        assert!(alerts.is_empty());
        assert_eq!(m.tracked_count(), 0);

        m.undismiss(&other.id);
        assert_eq!(m.check(TriggerPolicy::Entered, &[other], false).len(), 1);
    }

    #[test]
    fn test_elevation_band_excludes_entity() {
        let shape = square_shape();
        let fence = GeoFence::new("low", TriggerPolicy::Entered)
            .with_elevation(crate::fence::ElevationRange::new(None, Some(120.0)).unwrap());
        let m = FenceMonitor::new(
            fence,
            shape,
            SharedEngine::new(InMemorySpatialEngine::new()),
            MonitorConfig::default(),
        );

        let spot = origin().offset_meters(50.0, 50.0);
        let drone = MonitoredEntity::at(EntityId::new(), "UAV", spot.with_altitude(300.0));
        let walker = MonitoredEntity::at(EntityId::new(), "FOOT", spot.with_altitude(20.0));

        let alerts = m.check(TriggerPolicy::Entered, &[drone, walker.clone()], false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entity_id, walker.id);
    }

    #[test]
    fn test_lost_point_geometry_is_recreated_next_cycle() {
        let engine = SharedEngine::new(InMemorySpatialEngine::new());
        let m = FenceMonitor::new(
            GeoFence::new("square", TriggerPolicy::Entered),
            square_shape(),
            engine.clone(),
            MonitorConfig::default(),
        );
        let e = MonitoredEntity::at(EntityId::new(), "C", origin().offset_meters(50.0, 50.0));
        assert_eq!(m.check(TriggerPolicy::Entered, std::slice::from_ref(&e), false).len(), 1);

        let lost = m.lock("test").unwrap().tracker.get(&e.id).unwrap().handle;
        engine.delete_geometry(lost).unwrap();

        // Stationary entity: the cached handle is reused and fails once.
        assert!(m.check(TriggerPolicy::Entered, std::slice::from_ref(&e), false).is_empty());
        assert_eq!(m.tracked_count(), 0);

        for _ in 0..3 {
            assert_eq!(m.check(TriggerPolicy::Entered, std::slice::from_ref(&e), false).len(), 1);
        }
        assert_eq!(m.tracked_count(), 1);
    }

    #[test]
    fn test_furthest_point_range_of_square() {
        let m = monitor(square_shape());
        let range = m.furthest_point_range();
        // Half-diagonal of a 100 m square.
        assert!((range - 70.71).abs() < 0.5, "got {range}");
        assert!(m.center().is_some());
        assert!((m.monitoring_range_m() - range).abs() < f64::EPSILON);

        let ranged = FenceMonitor::new(
            GeoFence::new("wide", TriggerPolicy::Entered).with_range_km(1.5),
            square_shape(),
            SharedEngine::new(InMemorySpatialEngine::new()),
            MonitorConfig::default(),
        );
        assert!((ranged.monitoring_range_m() - 1_500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dispose_frees_geometries() {
        let mem = InMemorySpatialEngine::new();
        let stats = mem.stats();
        let shape = square_shape();
        let m = FenceMonitor::new(
            GeoFence::new("f", TriggerPolicy::Both),
            shape.clone(),
            SharedEngine::new(mem),
            MonitorConfig::default(),
        );
        m.check(
            TriggerPolicy::Both,
            &[MonitoredEntity::at(EntityId::new(), "A", origin())],
            true,
        );
        assert_eq!(stats.snapshot().live_geometries, 2);

        m.dispose();
        assert_eq!(stats.snapshot().live_geometries, 0);
        assert!(!m.is_valid());
        assert!(m
            .check(TriggerPolicy::Both, &[MonitoredEntity::at(EntityId::new(), "B", origin())], true)
            .is_empty());
    }
}
