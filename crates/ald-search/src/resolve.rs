//! Asynchronous reference-point resolution.
//!
//! The session lock is released while the geocoder is outstanding, so later
//! queries can be issued (and superseding tickets minted) in the meantime.

use ald_geocode::Geocoder;
use tokio::sync::Mutex;

use crate::session::{GeocodeTicket, SearchSession};

/// Geocodes `ticket`'s query and commits the result if it is still current.
///
/// Returns whether the result was applied.
pub async fn resolve_reference_point<G: Geocoder>(
    session: &Mutex<SearchSession>,
    geocoder: &G,
    ticket: GeocodeTicket,
) -> bool {
    let result = geocoder.geocode(ticket.query()).await;
    session.lock().await.commit_geocode(&ticket, result)
}

/// Sets the query and, when it is non-empty, resolves its reference point.
///
/// Returns whether a geocode result was applied.
pub async fn submit_query<G: Geocoder>(
    session: &Mutex<SearchSession>,
    geocoder: &G,
    query: &str,
) -> bool {
    let ticket = session.lock().await.set_query(query);
    match ticket {
        Some(ticket) => resolve_reference_point(session, geocoder, ticket).await,
        None => false,
    }
}
