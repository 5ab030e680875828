//! Geospatial facility search.
//!
//! [`filter_facilities`], [`paginate`], and [`derive_map_center`] are pure
//! functions over a facility slice. [`SearchSession`] owns the mutable search
//! state for one browsing view and resolves the reference point through a
//! [`ald_geocode::Geocoder`] with last-issued-query-wins ordering.

pub mod filter;
pub mod page;
pub mod resolve;
pub mod session;

pub use filter::{filter_facilities, FilterState};
pub use page::{derive_map_center, paginate, DEFAULT_PAGE_SIZE, MAX_MAP_MARKERS};
pub use resolve::{resolve_reference_point, submit_query};
pub use session::{GeocodeTicket, MapMarker, SearchSession, SearchView};
