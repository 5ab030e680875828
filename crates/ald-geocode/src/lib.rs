//! Geocoding provider contract, the Google Geocoding client, and the
//! coordinate backfill job.

pub mod backfill;
pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use backfill::{backfill_coordinates, BackfillOptions, BackfillReport};
pub use client::GoogleGeocoder;
pub use error::GeocodeError;
pub use types::Geocoder;
