//! Editable fence boundaries and their change notifications.
//!
//! A shape owns the vertex list of a fence. Edits publish a [`ShapeEvent`] to
//! every subscriber over a bounded channel; the subscriber drains its queue
//! when it is ready (a monitor does so at the start of each check), so no
//! callback ever runs on the editing thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::geo::{centroid, GeoPoint};

/// Unique identifier for a shape subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification that a shape's vertices changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeEvent {
    /// Vertex list, closure or anchor changed.
    PointsChanged {
        /// Shape revision after the change.
        revision: u64,
        /// The shape was mid bulk-edit when this change happened.
        bulk: bool,
    },
}

impl ShapeEvent {
    /// Returns true if the change happened during a bulk edit.
    #[must_use]
    pub const fn is_bulk(&self) -> bool {
        match self {
            Self::PointsChanged { bulk, .. } => *bulk,
        }
    }
}

/// Result of draining a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainedChanges {
    /// Events received since the last drain.
    pub count: usize,
    /// Most recent event, if any was received.
    pub latest: Option<ShapeEvent>,
    /// Events were dropped because the queue was full.
    pub overflowed: bool,
}

impl DrainedChanges {
    /// Returns true when anything changed since the last drain.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.count > 0 || self.overflowed
    }
}

/// Receiving end of a shape subscription.
#[derive(Debug)]
pub struct ShapeSubscription {
    id: SubscriptionId,
    rx: Receiver<ShapeEvent>,
    overflowed: Arc<AtomicBool>,
}

impl ShapeSubscription {
    /// The id to pass to [`ShapeSource::unsubscribe`].
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Consume every pending event without blocking.
    pub fn drain(&self) -> DrainedChanges {
        let mut out = DrainedChanges {
            overflowed: self.overflowed.swap(false, Ordering::AcqRel),
            ..DrainedChanges::default()
        };
        for event in self.rx.try_iter() {
            out.count += 1;
            out.latest = Some(event);
        }
        out
    }
}

/// Publishing end kept by a shape for each subscriber.
#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    tx: Sender<ShapeEvent>,
    overflowed: Arc<AtomicBool>,
}

/// Set of subscribers a shape publishes to.
///
/// Other [`ShapeSource`] implementations can reuse this for their own
/// notification plumbing.
#[derive(Debug, Default)]
pub struct ShapeNotifier {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ShapeNotifier {
    /// Register a new subscriber with a queue of `capacity` events.
    pub fn subscribe(&self, capacity: usize) -> ShapeSubscription {
        let (tx, rx) = bounded(capacity.max(1));
        let id = SubscriptionId::new();
        let overflowed = Arc::new(AtomicBool::new(false));
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(Subscriber {
                id,
                tx,
                overflowed: Arc::clone(&overflowed),
            });
        }
        ShapeSubscription { id, rx, overflowed }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|s| s.id != id);
        }
    }

    /// Publish `event` to every live subscriber without blocking.
    pub fn publish(&self, event: ShapeEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|s| match s.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                s.overflowed.store(true, Ordering::Release);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Source of a fence boundary.
pub trait ShapeSource: Send + Sync {
    /// True while the shape is mid bulk-edit and its vertices may be inconsistent.
    fn is_bulk_operation(&self) -> bool;

    /// True if the shape is a closed ring.
    fn is_closed(&self) -> bool;

    /// Number of distinct vertices (without a closing vertex).
    fn point_count(&self) -> usize;

    /// Current vertices, without a closing vertex.
    fn points(&self) -> Vec<GeoPoint>;

    /// Reference point of the shape.
    fn center(&self) -> Option<GeoPoint>;

    /// Entity that marks the shape's own center, excluded from monitoring.
    fn anchor_entity(&self) -> Option<EntityId>;

    /// Start receiving change events.
    fn subscribe(&self, capacity: usize) -> ShapeSubscription;

    /// Stop delivering change events to a subscription.
    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Debug, Clone)]
struct ShapeState {
    points: Vec<GeoPoint>,
    closed: bool,
    bulk_depth: u32,
    anchor: Option<EntityId>,
    center: Option<GeoPoint>,
    revision: u64,
}

/// Thread-safe editable polygon.
///
/// # Examples
///
/// ```
/// use kyrofence::{DrawingShape, GeoPoint, ShapeSource};
///
/// let shape = DrawingShape::closed(vec![
///     GeoPoint::from_degrees(0.0, 0.0),
///     GeoPoint::from_degrees(0.0, 0.01),
///     GeoPoint::from_degrees(0.01, 0.01),
/// ]);
/// let sub = shape.subscribe(8);
/// shape.add_point(GeoPoint::from_degrees(0.01, 0.0));
/// assert_eq!(sub.drain().count, 1);
/// assert_eq!(shape.point_count(), 4);
/// ```
#[derive(Debug)]
pub struct DrawingShape {
    state: RwLock<ShapeState>,
    notifier: ShapeNotifier,
}

impl DrawingShape {
    /// Create a shape from vertices.
    #[must_use]
    pub fn new(points: Vec<GeoPoint>, closed: bool) -> Self {
        Self {
            state: RwLock::new(ShapeState {
                points,
                closed,
                bulk_depth: 0,
                anchor: None,
                center: None,
                revision: 0,
            }),
            notifier: ShapeNotifier::default(),
        }
    }

    /// Create a closed shape from vertices.
    #[must_use]
    pub fn closed(points: Vec<GeoPoint>) -> Self {
        Self::new(points, true)
    }

    /// Current revision; incremented on every edit.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.read(|s| s.revision)
    }

    /// Replace every vertex.
    pub fn set_points(&self, points: Vec<GeoPoint>) {
        self.edit(|s| s.points = points);
    }

    /// Append a vertex.
    pub fn add_point(&self, point: GeoPoint) {
        self.edit(|s| s.points.push(point));
    }

    /// Remove the vertex at `index`; out-of-range indices are ignored.
    pub fn remove_point(&self, index: usize) {
        self.edit(|s| {
            if index < s.points.len() {
                s.points.remove(index);
            }
        });
    }

    /// Move the vertex at `index`; out-of-range indices are ignored.
    pub fn move_point(&self, index: usize, point: GeoPoint) {
        self.edit(|s| {
            if let Some(p) = s.points.get_mut(index) {
                *p = point;
            }
        });
    }

    /// Open or close the ring.
    pub fn set_closed(&self, closed: bool) {
        self.edit(|s| s.closed = closed);
    }

    /// Set the entity that marks this shape's center.
    pub fn set_anchor(&self, anchor: Option<EntityId>) {
        if let Ok(mut s) = self.state.write() {
            s.anchor = anchor;
        }
    }

    /// Override the computed center.
    pub fn set_center(&self, center: Option<GeoPoint>) {
        if let Ok(mut s) = self.state.write() {
            s.center = center;
        }
    }

    /// Enter a bulk edit. Nested calls must be balanced by `end_bulk`.
    pub fn begin_bulk(&self) {
        if let Ok(mut s) = self.state.write() {
            s.bulk_depth += 1;
        }
    }

    /// Leave a bulk edit. Leaving the outermost one publishes a single
    /// non-bulk change so subscribers pick up the final vertices.
    pub fn end_bulk(&self) {
        let event = {
            let Ok(mut s) = self.state.write() else {
                return;
            };
            if s.bulk_depth == 0 {
                return;
            }
            s.bulk_depth -= 1;
            if s.bulk_depth > 0 {
                return;
            }
            s.revision += 1;
            ShapeEvent::PointsChanged {
                revision: s.revision,
                bulk: false,
            }
        };
        self.notifier.publish(event);
    }

    fn edit(&self, f: impl FnOnce(&mut ShapeState)) {
        let event = {
            let Ok(mut s) = self.state.write() else {
                return;
            };
            f(&mut *s);
            s.revision += 1;
            ShapeEvent::PointsChanged {
                revision: s.revision,
                bulk: s.bulk_depth > 0,
            }
        };
        self.notifier.publish(event);
    }

    fn read<R: Default>(&self, f: impl FnOnce(&ShapeState) -> R) -> R {
        self.state.read().map(|s| f(&*s)).unwrap_or_default()
    }
}

impl ShapeSource for DrawingShape {
    fn is_bulk_operation(&self) -> bool {
        self.read(|s| s.bulk_depth > 0)
    }

    fn is_closed(&self) -> bool {
        self.read(|s| s.closed)
    }

    fn point_count(&self) -> usize {
        self.read(|s| s.points.len())
    }

    fn points(&self) -> Vec<GeoPoint> {
        self.read(|s| s.points.clone())
    }

    fn center(&self) -> Option<GeoPoint> {
        self.read(|s| s.center.or_else(|| centroid(&s.points)))
    }

    fn anchor_entity(&self) -> Option<EntityId> {
        self.read(|s| s.anchor)
    }

    fn subscribe(&self, capacity: usize) -> ShapeSubscription {
        self.notifier.subscribe(capacity)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }
}
