//! Coordinate backfill.
//!
//! Geocodes facilities that have no usable coordinates and writes the result
//! back to the store, pacing requests to stay inside the provider quota.

use std::time::Duration;

use ald_store::{FacilityStore, FacilityWriter, StoreError};
use serde::Serialize;

use crate::error::GeocodeError;
use crate::types::Geocoder;

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Upper bound on facilities processed per run, blank addresses included.
    pub max_requests: usize,
    /// Pause between consecutive geocoding requests.
    pub delay: Duration,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub updated: usize,
    pub skipped: usize,
    pub processed: usize,
}

/// Fill in missing coordinates for up to `options.max_requests` facilities.
///
/// Facilities with a blank address, no geocoding result, a geocoding error,
/// or a failed write are counted as skipped. A quota error ends the run
/// early; the partial report is still returned.
///
/// # Errors
///
/// Returns [`StoreError`] only if the facility list itself cannot be loaded.
pub async fn backfill_coordinates<S, G>(
    store: &S,
    geocoder: &G,
    options: &BackfillOptions,
) -> Result<BackfillReport, StoreError>
where
    S: FacilityStore + FacilityWriter,
    G: Geocoder,
{
    let facilities = store.list_facilities().await?;
    let pending: Vec<_> = facilities
        .iter()
        .filter(|f| f.coordinates().is_none())
        .take(options.max_requests)
        .collect();

    tracing::info!(
        total = facilities.len(),
        pending = pending.len(),
        max_requests = options.max_requests,
        "backfill: starting coordinate backfill"
    );

    let mut report = BackfillReport::default();
    let mut requested = false;

    for facility in pending {
        report.processed += 1;

        let Some(address) = facility.address_line() else {
            tracing::warn!(facility_id = %facility.id, "backfill: blank address; skipping");
            report.skipped += 1;
            continue;
        };

        if requested && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        requested = true;

        match geocoder.geocode(&address).await {
            Ok(Some(point)) => match store.update_coordinates(&facility.id, point).await {
                Ok(()) => {
                    tracing::debug!(
                        facility_id = %facility.id,
                        lat = point.lat,
                        lng = point.lng,
                        "backfill: coordinates updated"
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::warn!(facility_id = %facility.id, error = %e, "backfill: write failed");
                    report.skipped += 1;
                }
            },
            Ok(None) => {
                tracing::warn!(facility_id = %facility.id, address, "backfill: no geocoding result");
                report.skipped += 1;
            }
            Err(GeocodeError::QuotaExceeded(reason)) => {
                tracing::warn!(reason, "backfill: geocoding quota exhausted; stopping run");
                report.skipped += 1;
                break;
            }
            Err(e) => {
                tracing::warn!(facility_id = %facility.id, error = %e, "backfill: geocoding failed");
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        updated = report.updated,
        skipped = report.skipped,
        processed = report.processed,
        "backfill: run complete"
    );
    Ok(report)
}
