//! Provider contract and Google Geocoding wire types.

use std::future::Future;

use ald_core::GeoPoint;
use serde::Deserialize;

use crate::error::GeocodeError;

/// Resolves free-text addresses to coordinates.
///
/// `Ok(None)` means the provider answered but found nothing.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<GeoPoint>, GeocodeError>> + Send;
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}
