//! Exclusive-access wrapper around a spatial engine.
//!
//! Every monitor sharing one engine holds a clone of the same `SharedEngine`.
//! The lock is taken once per logical operation and released before the
//! caller does any unrelated work.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::EngineError;
use crate::geo::GeoPoint;

use super::traits::{GeometryHandle, SpatialEngine};

/// A spatial engine behind a single owned mutex.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Box<dyn SpatialEngine>>>,
}

impl SharedEngine {
    /// Wrap an engine for shared use.
    pub fn new(engine: impl SpatialEngine + 'static) -> Self {
        let boxed: Box<dyn SpatialEngine> = Box::new(engine);
        Self {
            inner: Arc::new(Mutex::new(boxed)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// A poisoned lock means a previous call panicked mid-operation; it is
    /// reported as a storage failure rather than trusted.
    pub fn with<R>(
        &self,
        context: &'static str,
        f: impl FnOnce(&mut dyn SpatialEngine) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| EngineError::storage(format!("poisoned engine lock: {context}")))?;
        f(guard.as_mut())
    }

    /// See [`SpatialEngine::create_polygon`].
    pub fn create_polygon(&self, ring: &[GeoPoint]) -> Result<GeometryHandle, EngineError> {
        self.with("create_polygon", |e| e.create_polygon(ring))
    }

    /// See [`SpatialEngine::update_polygon`].
    pub fn update_polygon(&self, handle: GeometryHandle, ring: &[GeoPoint]) -> Result<(), EngineError> {
        self.with("update_polygon", |e| e.update_polygon(handle, ring))
    }

    /// See [`SpatialEngine::create_point`].
    pub fn create_point(&self, point: &GeoPoint) -> Result<GeometryHandle, EngineError> {
        self.with("create_point", |e| e.create_point(point))
    }

    /// See [`SpatialEngine::update_point`].
    pub fn update_point(&self, handle: GeometryHandle, point: &GeoPoint) -> Result<(), EngineError> {
        self.with("update_point", |e| e.update_point(handle, point))
    }

    /// See [`SpatialEngine::delete_geometry`].
    pub fn delete_geometry(&self, handle: GeometryHandle) -> Result<(), EngineError> {
        self.with("delete_geometry", |e| e.delete_geometry(handle))
    }

    /// See [`SpatialEngine::contains`].
    pub fn contains(&self, polygon: GeometryHandle, point: GeometryHandle) -> Result<bool, EngineError> {
        self.with("contains", |e| e.contains(polygon, point))
    }

    /// Returns true if both values refer to the same underlying engine.
    #[must_use]
    pub fn same_engine(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEngine")
            .field("monitors", &Arc::strong_count(&self.inner))
            .finish()
    }
}
