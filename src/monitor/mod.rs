//! Fence monitoring engine.
//!
//! A [`FenceMonitor`] composes a [`PolygonRegistry`] (the fence polygon), a
//! [`PointTracker`] (one engine point per entity) and the trigger logic in
//! [`triggers`]. Everything runs on the caller's thread; there is no worker.

/// Alert records.
pub mod alert;
/// The orchestrating monitor.
pub mod fence_monitor;
/// Fence polygon ownership.
pub mod registry;
/// Entity point cache.
pub mod tracker;
/// Trigger decisions and containment history.
pub mod triggers;

pub use alert::{Alert, AlertKind};
pub use fence_monitor::{FenceMonitor, MonitorState};
pub use registry::{PolygonRegistry, RebuildOutcome, MIN_FENCE_POINTS};
pub use tracker::{ObserveAction, Observation, PointTracker, TrackedPoint};
pub use triggers::{should_alert, should_alert_transition, EntityStateTable};
