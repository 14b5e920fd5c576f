//! Coordinates and great-circle distance.
//!
//! Distances are computed with the Haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. That is accurate to well under 0.5% which is far more
//! precise than a delivery radius needs.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors constructing a [`Coordinates`] value.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    /// Latitude outside `-90..=90` or not finite.
    #[error("latitude {0} is out of range (-90..=90)")]
    Latitude(f64),
    /// Longitude outside `-180..=180` or not finite.
    #[error("longitude {0} is out of range (-180..=180)")]
    Longitude(f64),
}

/// A WGS84 latitude/longitude pair in decimal degrees.
///
/// Deserialization goes through [`Coordinates::new`], so out-of-range
/// values are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = GeoError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    /// Create coordinates, validating both ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] when either component is non-finite or out of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to `other` in kilometers.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Haversine great-circle distance between two points, in kilometers.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards against h drifting a hair above 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}
