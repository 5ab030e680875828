//! Geographic points and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance math, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Map center used before any facility or query has been located (Baltimore).
pub const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint {
    lat: 39.290_4,
    lng: -76.612_2,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point only when both components are finite and inside the
    /// valid latitude/longitude ranges.
    #[must_use]
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let point = Self { lat, lng };
        point.is_valid().then_some(point)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    #[must_use]
    pub fn distance_miles(&self, other: &GeoPoint) -> f64 {
        haversine_miles(*self, *other)
    }
}

/// Great-circle distance between two points using the Haversine formula.
#[must_use]
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().atan2((1.0 - h).sqrt())
}
