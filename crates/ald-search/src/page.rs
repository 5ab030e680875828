//! Pagination and map centering over an already-filtered list.

use ald_core::{Facility, GeoPoint};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Upper bound on markers handed to the map renderer.
pub const MAX_MAP_MARKERS: usize = 50;

/// The first `loaded_pages * page_size` items.
#[must_use]
pub fn paginate<T>(items: &[T], page_size: usize, loaded_pages: usize) -> &[T] {
    let end = page_size.saturating_mul(loaded_pages).min(items.len());
    &items[..end]
}

/// Center on the first facility with valid coordinates, else keep `previous`.
#[must_use]
pub fn derive_map_center<'a, I>(visible: I, previous: GeoPoint) -> GeoPoint
where
    I: IntoIterator<Item = &'a Facility>,
{
    visible
        .into_iter()
        .find_map(Facility::coordinates)
        .unwrap_or(previous)
}
