//! The facility filter pipeline: text match, certification flags, radius.

use ald_core::{Facility, GeoPoint};
use serde::{Deserialize, Serialize};

/// User-selected filters. A `radius_miles` of zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub radius_miles: u32,
    pub medicaid_certified: bool,
    pub sals_certified: bool,
}

impl FilterState {
    #[must_use]
    pub fn has_radius(&self) -> bool {
        self.radius_miles > 0
    }
}

/// Facilities passing every filter, in input order.
///
/// The radius step applies only when `filters.radius_miles > 0` and a
/// reference point is known; it drops facilities without valid coordinates.
/// The text and flag steps never look at coordinates.
#[must_use]
pub fn filter_facilities<'a>(
    facilities: &'a [Facility],
    query: &str,
    filters: &FilterState,
    reference: Option<GeoPoint>,
) -> Vec<&'a Facility> {
    let needle = normalize_query(query);
    facilities
        .iter()
        .filter(|f| passes(f, &needle, filters, reference))
        .collect()
}

/// Trimmed, lowercased query text. Empty means "match everything".
pub(crate) fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// `needle` must already be normalized with [`normalize_query`].
pub(crate) fn passes(
    facility: &Facility,
    needle: &str,
    filters: &FilterState,
    reference: Option<GeoPoint>,
) -> bool {
    matches_text(facility, needle)
        && matches_flags(facility, filters)
        && within_radius(facility, filters, reference)
}

fn matches_text(facility: &Facility, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [&facility.city, &facility.county, &facility.zip]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn matches_flags(facility: &Facility, filters: &FilterState) -> bool {
    (!filters.medicaid_certified || facility.is_medicaid_certified())
        && (!filters.sals_certified || facility.is_sals_certified())
}

fn within_radius(facility: &Facility, filters: &FilterState, reference: Option<GeoPoint>) -> bool {
    if !filters.has_radius() {
        return true;
    }
    // Without a reference point there is nothing to measure from.
    let Some(reference) = reference else {
        return true;
    };
    facility
        .coordinates()
        .is_some_and(|point| reference.distance_miles(&point) <= f64::from(filters.radius_miles))
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
