//! Spatial engine seam.
//!
//! The engine that stores geometries and answers point-in-polygon queries is
//! an external collaborator. This module defines its contract, the
//! exclusive-access wrapper every monitor goes through, and an in-memory
//! reference backend.

mod memory;
mod shared;
mod traits;

pub use memory::{EngineStats, EngineStatsSnapshot, InMemorySpatialEngine};
pub use shared::SharedEngine;
pub use traits::{GeometryHandle, SpatialEngine};
