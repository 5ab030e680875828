//! Facility and user store contracts plus the REST backend client that
//! implements them.

pub mod client;
pub mod error;
pub mod store;

pub use client::BackendClient;
pub use error::StoreError;
pub use store::{FacilityStore, FacilityWriter, UserStore};
