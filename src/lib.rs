//! # KyroFence - Geofence Monitoring Engine
//!
//! KyroFence watches moving entities against closed polygon boundaries that
//! can be edited while monitoring is running, and raises alerts when entities
//! cross a boundary according to a trigger policy.
//!
//! ## Core Concepts
//!
//! - **Fence**: a closed polygon registered in a spatial engine
//! - **Shape**: the editable vertex list behind a fence, publishing change events
//! - **Tracked point**: an entity's point geometry, moved only past a threshold
//! - **Trigger policy**: which containment transitions alert (entered, exited, both)
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use kyrofence::{
//!     DrawingShape, EntityId, FenceMonitor, GeoFence, GeoPoint, InMemorySpatialEngine,
//!     MonitorConfig, MonitoredEntity, SharedEngine, TriggerPolicy,
//! };
//!
//! let origin = GeoPoint::from_degrees(38.0, -77.0);
//! let shape = Arc::new(DrawingShape::closed(vec![
//!     origin,
//!     origin.offset_meters(0.0, 100.0),
//!     origin.offset_meters(100.0, 100.0),
//!     origin.offset_meters(100.0, 0.0),
//! ]));
//! let engine = SharedEngine::new(InMemorySpatialEngine::new());
//! let monitor = FenceMonitor::new(
//!     GeoFence::new("compound", TriggerPolicy::Entered),
//!     shape,
//!     engine,
//!     MonitorConfig::default(),
//! );
//!
//! let id = EntityId::new();
//! let outside = MonitoredEntity::at(id, "ALPHA", origin.offset_meters(-200.0, 50.0));
//! assert!(monitor.check_fence(&[outside]).is_empty());
//!
//! let inside = MonitoredEntity::at(id, "ALPHA", origin.offset_meters(50.0, 50.0));
//! let alerts = monitor.check_fence(&[inside]);
//! assert_eq!(alerts.len(), 1);
//! assert!(alerts[0].inside);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod fence;
pub mod geo;
pub mod monitor;
pub mod shape;

// Re-export primary types at crate root for convenience
pub use config::{MonitorConfig, DEFAULT_MOVEMENT_THRESHOLD_M};
pub use engine::{EngineStats, GeometryHandle, InMemorySpatialEngine, SharedEngine, SpatialEngine};
pub use entity::{EntityId, MonitoredEntity};
pub use error::{EngineError, FenceError, FenceResult, ValidationError};
pub use fence::{ElevationRange, FenceId, GeoFence, TriggerPolicy};
pub use geo::GeoPoint;
pub use monitor::{Alert, AlertKind, FenceMonitor, MonitorState, RebuildOutcome};
pub use shape::{DrawingShape, ShapeEvent, ShapeSource, ShapeSubscription, SubscriptionId};
