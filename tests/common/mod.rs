//! Shared test helpers for monitor tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kyrofence::engine::EngineStats;
use kyrofence::{
    DrawingShape, EngineError, GeoPoint, GeometryHandle, InMemorySpatialEngine, SpatialEngine,
};

/// Reference corner of every test fence.
pub fn origin() -> GeoPoint {
    GeoPoint::from_degrees(38.8895, -77.0353)
}

/// Vertices of a `side` x `side` metre square with its south-west corner at `origin()`.
pub fn square(side: f64) -> Vec<GeoPoint> {
    let o = origin();
    vec![
        o,
        o.offset_meters(0.0, side),
        o.offset_meters(side, side),
        o.offset_meters(side, 0.0),
    ]
}

/// A closed 100 m square shape.
pub fn square_shape() -> Arc<DrawingShape> {
    Arc::new(DrawingShape::closed(square(100.0)))
}

/// Center of the 100 m square.
pub fn square_center() -> GeoPoint {
    origin().offset_meters(50.0, 50.0)
}

/// Faults to inject into a [`FaultyEngine`].
#[derive(Debug, Default)]
pub struct Faults {
    /// `contains` fails with a storage error for points stored at these locations.
    pub contains_fails_at: Vec<GeoPoint>,
    /// Every `create_point` is rejected.
    pub reject_create_point: bool,
    /// Every `create_polygon` fails with a storage error.
    pub polygon_storage_failure: bool,
}

/// In-memory engine with switchable failures.
pub struct FaultyEngine {
    inner: InMemorySpatialEngine,
    faults: Arc<Mutex<Faults>>,
    locations: HashMap<GeometryHandle, GeoPoint>,
}

impl FaultyEngine {
    pub fn new() -> (Self, Arc<Mutex<Faults>>, Arc<EngineStats>) {
        let inner = InMemorySpatialEngine::new();
        let stats = inner.stats();
        let faults = Arc::new(Mutex::new(Faults::default()));
        (
            Self {
                inner,
                faults: Arc::clone(&faults),
                locations: HashMap::new(),
            },
            faults,
            stats,
        )
    }
}

fn same_spot(a: &GeoPoint, b: &GeoPoint) -> bool {
    (a.latitude - b.latitude).abs() < 1e-12 && (a.longitude - b.longitude).abs() < 1e-12
}

impl SpatialEngine for FaultyEngine {
    fn create_polygon(&mut self, ring: &[GeoPoint]) -> Result<GeometryHandle, EngineError> {
        if self.faults.lock().unwrap().polygon_storage_failure {
            return Err(EngineError::storage("database disk image is malformed"));
        }
        self.inner.create_polygon(ring)
    }

    fn update_polygon(&mut self, handle: GeometryHandle, ring: &[GeoPoint]) -> Result<(), EngineError> {
        self.inner.update_polygon(handle, ring)
    }

    fn create_point(&mut self, point: &GeoPoint) -> Result<GeometryHandle, EngineError> {
        if self.faults.lock().unwrap().reject_create_point {
            return Err(EngineError::rejected("point table full"));
        }
        let handle = self.inner.create_point(point)?;
        self.locations.insert(handle, *point);
        Ok(handle)
    }

    fn update_point(&mut self, handle: GeometryHandle, point: &GeoPoint) -> Result<(), EngineError> {
        self.inner.update_point(handle, point)?;
        self.locations.insert(handle, *point);
        Ok(())
    }

    fn delete_geometry(&mut self, handle: GeometryHandle) -> Result<(), EngineError> {
        self.locations.remove(&handle);
        self.inner.delete_geometry(handle)
    }

    fn contains(&mut self, polygon: GeometryHandle, point: GeometryHandle) -> Result<bool, EngineError> {
        if let Some(loc) = self.locations.get(&point) {
            let faults = self.faults.lock().unwrap();
            if faults.contains_fails_at.iter().any(|f| same_spot(f, loc)) {
                return Err(EngineError::storage("contains query failed"));
            }
        }
        self.inner.contains(polygon, point)
    }
}
