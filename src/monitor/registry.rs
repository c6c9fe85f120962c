//! Ownership of a fence's polygon in the spatial engine.

use tracing::{debug, error, warn};

use crate::engine::{GeometryHandle, SharedEngine};
use crate::error::{EngineError, ValidationError};
use crate::geo::GeoPoint;
use crate::shape::{ShapeSource, ShapeSubscription};

/// Fewest vertices that make a polygon.
pub const MIN_FENCE_POINTS: usize = 3;

/// What a rebuild attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Nothing to do: no pending change, or the registry is already invalid.
    Unchanged,
    /// The shape is mid bulk-edit; the rebuild waits for the edit to finish.
    Deferred,
    /// The polygon geometry was replaced in place.
    Rebuilt,
    /// The shape became malformed or the engine failed; the handle is gone.
    Invalidated,
}

/// Checks that a vertex list can form a fence polygon.
fn check_ring(closed: bool, points: usize) -> Result<(), ValidationError> {
    if !closed {
        return Err(ValidationError::ShapeNotClosed);
    }
    if points < MIN_FENCE_POINTS {
        return Err(ValidationError::TooFewPoints {
            required: MIN_FENCE_POINTS,
            actual: points,
        });
    }
    Ok(())
}

/// Appends the first vertex so the ring is explicitly closed.
fn closed_ring(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = Vec::with_capacity(vertices.len() + 1);
    ring.extend_from_slice(vertices);
    if let Some(first) = vertices.first() {
        ring.push(*first);
    }
    ring
}

/// Owns exactly one polygon handle for one fence.
///
/// The handle is created once and updated in place on every accepted shape
/// change. Once invalidated it stays invalid; recovering means building a new
/// registry.
#[derive(Debug)]
pub struct PolygonRegistry {
    engine: SharedEngine,
    handle: GeometryHandle,
    label: String,
}

impl PolygonRegistry {
    /// Register `vertices` as a new polygon.
    ///
    /// Never fails: with too few vertices or an engine error the registry is
    /// created invalid and the cause is logged.
    pub fn create(engine: SharedEngine, vertices: &[GeoPoint], label: impl Into<String>) -> Self {
        let label = label.into();
        let handle = if let Err(err) = check_ring(true, vertices.len()) {
            warn!(fence = %label, error = %err, "shape does not have enough points to create fence");
            GeometryHandle::INVALID
        } else {
            match engine.create_polygon(&closed_ring(vertices)) {
                Ok(handle) => handle,
                Err(err) => {
                    log_engine_failure(&label, "create", &err);
                    GeometryHandle::INVALID
                }
            }
        };

        if !handle.is_valid() {
            warn!(fence = %label, "unable to insert fence polygon");
        } else {
            debug!(fence = %label, %handle, "fence polygon registered");
        }

        Self {
            engine,
            handle,
            label,
        }
    }

    /// Current polygon handle (`GeometryHandle::INVALID` once invalidated).
    #[must_use]
    pub const fn handle(&self) -> GeometryHandle {
        self.handle
    }

    /// True while the polygon is registered.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// Consume pending change events and rebuild at most once.
    pub fn drain_changes(&mut self, subscription: &ShapeSubscription, shape: &dyn ShapeSource) -> RebuildOutcome {
        let drained = subscription.drain();
        if !drained.changed() {
            return RebuildOutcome::Unchanged;
        }
        // The bulk flag on queued events may be stale: the closing event can be
        // lost to a full queue. Only the shape knows whether an edit is open.
        debug!(
            fence = %self.label,
            events = drained.count,
            overflowed = drained.overflowed,
            "shape changed"
        );
        self.rebuild(shape)
    }

    /// Rebuild the polygon from the shape's current vertices.
    pub fn rebuild(&mut self, shape: &dyn ShapeSource) -> RebuildOutcome {
        if !self.is_valid() {
            warn!(fence = %self.label, "unable to update invalid fence");
            return RebuildOutcome::Unchanged;
        }

        if shape.is_bulk_operation() {
            debug!(fence = %self.label, "shape busy, deferring rebuild");
            return RebuildOutcome::Deferred;
        }

        let vertices = shape.points();
        if let Err(err) = check_ring(shape.is_closed(), vertices.len()) {
            warn!(fence = %self.label, error = %err, "unable to update fence shape, invalidating fence");
            self.invalidate();
            return RebuildOutcome::Invalidated;
        }

        debug!(fence = %self.label, handle = %self.handle, points = vertices.len(), "updating fence polygon");
        match self.engine.update_polygon(self.handle, &closed_ring(&vertices)) {
            Ok(()) => RebuildOutcome::Rebuilt,
            Err(err) => {
                log_engine_failure(&self.label, "update", &err);
                self.invalidate();
                RebuildOutcome::Invalidated
            }
        }
    }

    /// Drop the polygon; the registry is invalid afterwards.
    pub fn invalidate(&mut self) {
        self.release();
    }

    /// Delete the polygon geometry, best-effort.
    pub fn release(&mut self) {
        let handle = std::mem::replace(&mut self.handle, GeometryHandle::INVALID);
        if !handle.is_valid() {
            return;
        }
        if let Err(err) = self.engine.delete_geometry(handle) {
            warn!(fence = %self.label, %handle, error = %err, "failed to delete fence polygon");
        }
    }
}

fn log_engine_failure(label: &str, op: &'static str, err: &EngineError) {
    if err.is_severe() {
        error!(fence = %label, op, error = %err, "spatial storage failure on fence polygon");
    } else {
        warn!(fence = %label, op, error = %err, "spatial engine rejected fence polygon");
    }
}
