//! In-memory stores for watcher tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ald_core::Facility;
use ald_store::{FacilityStore, StoreError, UserStore};

/// Facility store whose bed counts can be changed between cycles.
/// A facility mapped to `None` fails to fetch.
#[derive(Default)]
pub(crate) struct MemoryFacilities {
    beds: Mutex<HashMap<String, Option<i64>>>,
    pub(crate) fetches: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) peak_in_flight: AtomicUsize,
}

impl MemoryFacilities {
    pub(crate) fn set(&self, id: &str, beds: i64) {
        self.beds.lock().unwrap().insert(id.to_owned(), Some(beds));
    }

    pub(crate) fn fail(&self, id: &str) {
        self.beds.lock().unwrap().insert(id.to_owned(), None);
    }
}

impl FacilityStore for MemoryFacilities {
    async fn list_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        let beds = self.beds.lock().unwrap().clone();
        Ok(beds
            .into_iter()
            .filter_map(|(id, b)| b.map(|b| facility(&id, Some(b))))
            .collect())
    }

    async fn get_facility(&self, id: &str) -> Result<Facility, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let beds = self.beds.lock().unwrap().get(id).copied();
        match beds {
            Some(Some(b)) => Ok(facility(id, Some(b))),
            Some(None) => Err(StoreError::UnexpectedStatus {
                status: 503,
                url: format!("memory://{id}"),
            }),
            None => Err(StoreError::NotFound {
                url: format!("memory://{id}"),
            }),
        }
    }
}

/// Saved lists per user; snapshots carry the bed count at save time.
#[derive(Default)]
pub(crate) struct MemoryUsers {
    saved: Mutex<HashMap<String, Vec<Facility>>>,
    failing: Mutex<bool>,
}

impl MemoryUsers {
    pub(crate) fn save(&self, user_id: &str, id: &str, snapshot_beds: Option<i64>) {
        self.saved
            .lock()
            .unwrap()
            .entry(user_id.to_owned())
            .or_default()
            .push(facility(id, snapshot_beds));
    }

    pub(crate) fn unsave(&self, user_id: &str, id: &str) {
        if let Some(list) = self.saved.lock().unwrap().get_mut(user_id) {
            list.retain(|f| f.id != id);
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl UserStore for MemoryUsers {
    async fn saved_facilities(&self, user_id: &str) -> Result<Vec<Facility>, StoreError> {
        if *self.failing.lock().unwrap() {
            return Err(StoreError::UnexpectedStatus {
                status: 500,
                url: format!("memory://users/{user_id}"),
            });
        }
        Ok(self
            .saved
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        self.save(user_id, facility_id, None);
        Ok(())
    }

    async fn remove_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        self.unsave(user_id, facility_id);
        Ok(())
    }
}

pub(crate) fn facility(id: &str, beds: Option<i64>) -> Facility {
    let mut f = Facility::new(id);
    f.name = Some(format!("Home {id}"));
    f.bed_count = beds;
    f
}
