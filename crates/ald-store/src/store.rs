//! Collaborator contracts consumed by the search and watch engines.
//!
//! Both engines are generic over these traits so tests can substitute
//! in-memory stores for the REST backend.

use std::future::Future;

use ald_core::{Facility, GeoPoint};

use crate::error::StoreError;

/// Read access to facility records.
pub trait FacilityStore: Send + Sync {
    /// Every facility in the store, in store order.
    fn list_facilities(&self) -> impl Future<Output = Result<Vec<Facility>, StoreError>> + Send;

    /// Current state of one facility. A missing facility is
    /// [`StoreError::NotFound`].
    fn get_facility(&self, id: &str)
        -> impl Future<Output = Result<Facility, StoreError>> + Send;
}

/// Write access used by the coordinate backfill.
pub trait FacilityWriter: Send + Sync {
    fn update_coordinates(
        &self,
        id: &str,
        point: GeoPoint,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A user's saved-facility list.
pub trait UserStore: Send + Sync {
    /// Snapshots of the user's saved facilities as last persisted with the
    /// user. Snapshot fields may be stale relative to the facility store.
    fn saved_facilities(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Facility>, StoreError>> + Send;

    fn add_saved(
        &self,
        user_id: &str,
        facility_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove_saved(
        &self,
        user_id: &str,
        facility_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
