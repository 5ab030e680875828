//! Owned search state for one browsing view.
//!
//! Every external event (query edit, filter change, geolocation, geocode
//! completion, "load more", marker selection) enters through one method and
//! leaves the derived state (visible set, map center) consistent.

use ald_core::{Facility, GeoPoint, DEFAULT_MAP_CENTER};
use ald_geocode::GeocodeError;
use serde::Serialize;

use crate::filter::{normalize_query, passes, FilterState};
use crate::page::{derive_map_center, paginate, DEFAULT_PAGE_SIZE, MAX_MAP_MARKERS};

/// Proof that a geocode was requested for a particular query.
///
/// Only the ticket from the most recently issued request can commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeTicket {
    generation: u64,
    query: String,
}

impl GeocodeTicket {
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    /// Position in the visible list; pass to [`SearchSession::select_facility`].
    pub index: usize,
    pub facility_id: String,
    pub name: String,
    pub position: GeoPoint,
}

/// Read-only snapshot handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub query: String,
    pub filters: FilterState,
    pub total: usize,
    pub loaded_pages: usize,
    pub has_more: bool,
    pub facilities: Vec<Facility>,
    pub markers: Vec<MapMarker>,
    pub map_center: GeoPoint,
    pub reference_point: Option<GeoPoint>,
    pub selected: Option<usize>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    facilities: Vec<Facility>,
    query: String,
    filters: FilterState,
    reference_point: Option<GeoPoint>,
    generation: u64,
    page_size: usize,
    loaded_pages: usize,
    map_center: GeoPoint,
    selected: Option<usize>,
    notice: Option<String>,
    /// Indices into `facilities` that pass the current filters.
    visible: Vec<usize>,
}

impl SearchSession {
    #[must_use]
    pub fn new(facilities: Vec<Facility>) -> Self {
        Self::with_page_size(facilities, DEFAULT_PAGE_SIZE)
    }

    /// A zero `page_size` is treated as one.
    #[must_use]
    pub fn with_page_size(facilities: Vec<Facility>, page_size: usize) -> Self {
        let mut session = Self {
            facilities,
            query: String::new(),
            filters: FilterState::default(),
            reference_point: None,
            generation: 0,
            page_size: page_size.max(1),
            loaded_pages: 1,
            map_center: DEFAULT_MAP_CENTER,
            selected: None,
            notice: None,
            visible: Vec::new(),
        };
        session.recompute();
        session
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn filters(&self) -> FilterState {
        self.filters
    }

    #[must_use]
    pub fn reference_point(&self) -> Option<GeoPoint> {
        self.reference_point
    }

    #[must_use]
    pub fn map_center(&self) -> GeoPoint {
        self.map_center
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn loaded_pages(&self) -> usize {
        self.loaded_pages
    }

    /// Number of facilities passing the filters, across all pages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.visible.len()
    }

    /// The loaded pages of the visible set, in facility-list order.
    pub fn visible(&self) -> impl Iterator<Item = &Facility> + '_ {
        paginate(&self.visible, self.page_size, self.loaded_pages)
            .iter()
            .map(|&i| &self.facilities[i])
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page_size.saturating_mul(self.loaded_pages) < self.visible.len()
    }

    /// Replaces the facility list, e.g. after a store refresh.
    pub fn set_facilities(&mut self, facilities: Vec<Facility>) {
        self.facilities = facilities;
        self.recompute();
    }

    /// Records a new query and returns a ticket when it needs geocoding.
    ///
    /// Any query change supersedes geocodes still in flight. An empty query
    /// keeps the last resolved reference point. Loaded pages reset to one.
    pub fn set_query(&mut self, query: &str) -> Option<GeocodeTicket> {
        let query = query.trim();
        if query == self.query {
            return None;
        }

        self.query = query.to_owned();
        self.generation += 1;
        self.loaded_pages = 1;
        self.recompute();

        if self.query.is_empty() {
            return None;
        }
        Some(GeocodeTicket {
            generation: self.generation,
            query: self.query.clone(),
        })
    }

    /// Applies a finished geocode. Returns `false` if a newer request has
    /// since been issued, in which case the result is dropped.
    pub fn commit_geocode(
        &mut self,
        ticket: &GeocodeTicket,
        result: Result<Option<GeoPoint>, GeocodeError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                query = %ticket.query,
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "search: discarding stale geocode result"
            );
            return false;
        }

        match result {
            Ok(Some(point)) => {
                self.reference_point = Some(point);
                self.notice = None;
            }
            Ok(None) => {
                tracing::warn!(query = %ticket.query, "search: no geocoding result");
                self.reference_point = None;
                self.notice = Some(format!(
                    "No location found for \"{}\"; distance filtering is unavailable.",
                    ticket.query
                ));
            }
            Err(e) => {
                tracing::warn!(query = %ticket.query, error = %e, "search: geocoding failed");
                self.reference_point = None;
                self.notice = Some(format!(
                    "Could not look up \"{}\"; distance filtering is unavailable.",
                    ticket.query
                ));
            }
        }
        self.recompute();
        true
    }

    /// Uses a device-reported location as the reference point.
    pub fn set_user_location(&mut self, point: GeoPoint) {
        self.generation += 1;
        self.reference_point = Some(point);
        self.notice = None;
        self.recompute();
    }

    /// Clears the reference point and supersedes in-flight geocodes.
    pub fn reset_reference_point(&mut self) {
        self.generation += 1;
        self.reference_point = None;
        self.notice = None;
        self.recompute();
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.recompute();
    }

    /// Loads one more page. Returns `false` when everything is already shown.
    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.loaded_pages += 1;
        true
    }

    /// Centers the map on the facility at `index` in the visible list.
    ///
    /// Facilities without valid coordinates cannot be selected.
    pub fn select_facility(&mut self, index: usize) -> bool {
        let point = self.visible().nth(index).and_then(Facility::coordinates);
        match point {
            Some(point) => {
                self.map_center = point;
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn view(&self) -> SearchView {
        let facilities: Vec<Facility> = self.visible().cloned().collect();
        let markers = facilities
            .iter()
            .enumerate()
            .filter_map(|(index, f)| {
                f.coordinates().map(|position| MapMarker {
                    index,
                    facility_id: f.id.clone(),
                    name: f.display_name().to_owned(),
                    position,
                })
            })
            .take(MAX_MAP_MARKERS)
            .collect();

        SearchView {
            query: self.query.clone(),
            filters: self.filters,
            total: self.total(),
            loaded_pages: self.loaded_pages,
            has_more: self.has_more(),
            facilities,
            markers,
            map_center: self.map_center,
            reference_point: self.reference_point,
            selected: self.selected,
            notice: self.notice.clone(),
        }
    }

    /// Refilters and recenters; with nothing located in view the map stays put.
    fn recompute(&mut self) {
        let needle = normalize_query(&self.query);
        self.visible = self
            .facilities
            .iter()
            .enumerate()
            .filter(|(_, f)| passes(f, &needle, &self.filters, self.reference_point))
            .map(|(i, _)| i)
            .collect();
        self.selected = None;

        self.map_center = derive_map_center(
            self.visible.iter().map(|&i| &self.facilities[i]),
            self.map_center,
        );
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
