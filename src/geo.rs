//! Geodetic point type and distance helpers.
//!
//! Coordinates are WGS84 degrees. Altitude is optional and expressed in metres
//! height above ellipsoid; an unknown altitude is `None`, never a magic number.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A location on the earth's surface.
///
/// # Examples
///
/// ```
/// use kyrofence::GeoPoint;
///
/// let a = GeoPoint::new(51.5007, -0.1246, None).unwrap();
/// let b = a.offset_meters(100.0, 0.0);
/// assert!((a.distance_to(&b) - 100.0).abs() < 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
    /// Altitude in metres, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl GeoPoint {
    /// Creates a validated point.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when latitude or longitude is out of range
    /// (or not finite).
    pub fn new(latitude: f64, longitude: f64, altitude: Option<f64>) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange { value: latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: altitude.filter(|a| a.is_finite()),
        })
    }

    /// Creates a point without altitude, skipping validation.
    #[must_use]
    pub const fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    /// Returns a copy of this point with the given altitude.
    #[must_use]
    pub const fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Great-circle (haversine) distance to `other`, in metres.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }

    /// Moves this point `north` and `east` metres using a local tangent plane.
    ///
    /// Accurate to well under a metre for offsets of a few kilometres away
    /// from the poles.
    #[must_use]
    pub fn offset_meters(&self, north: f64, east: f64) -> Self {
        let dlat = (north / EARTH_RADIUS_M).to_degrees();
        let dlon = (east / (EARTH_RADIUS_M * self.latitude.to_radians().cos())).to_degrees();
        Self {
            latitude: self.latitude + dlat,
            longitude: self.longitude + dlon,
            altitude: self.altitude,
        }
    }
}

/// Average of the given vertices; `None` for an empty slice.
#[must_use]
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    Some(GeoPoint::from_degrees(lat / n, lon / n))
}
