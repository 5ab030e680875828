//! The fetch half of a watch cycle.

use ald_core::Facility;
use ald_store::FacilityStore;
use futures::stream::{self, StreamExt};

/// Saved-facility fetches in flight at once per cycle.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// What one cycle learned about one saved facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub facility_id: String,
    pub name: String,
    /// Bed count held in the user's saved snapshot.
    pub snapshot_value: Option<i64>,
    /// Freshly fetched bed count; `None` if the fetch failed or the field is
    /// missing.
    pub current: Option<i64>,
}

/// One snapshot paired with its fresh fetch. A named function (rather than an
/// inline `async` closure) so the future's `Send`-ness is provable for every
/// lifetime when the cycle is spawned.
fn fetch<'a, S: FacilityStore>(
    store: &'a S,
    snapshot: &'a Facility,
) -> impl std::future::Future<Output = (&'a Facility, Result<Facility, ald_store::StoreError>)> + Send + 'a
{
    async move { (snapshot, store.get_facility(&snapshot.id).await) }
}

/// Re-fetches every saved facility, at most [`MAX_CONCURRENT_FETCHES`] at a
/// time.
///
/// Individual failures are logged and yield `current: None`; the returned
/// list has one entry per snapshot, in snapshot order, once every fetch has
/// settled.
pub async fn observe<S: FacilityStore>(store: &S, saved: &[Facility]) -> Vec<Observation> {
    // Futures are lazy: building them up front starts no fetch; `buffered`
    // still polls at most MAX_CONCURRENT_FETCHES at a time.
    let fetches: Vec<_> = saved.iter().map(|snapshot| fetch(store, snapshot)).collect();
    let results: Vec<_> = stream::iter(fetches)
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    results
        .into_iter()
        .map(|(snapshot, result)| match result {
            Ok(fresh) => Observation {
                facility_id: snapshot.id.clone(),
                name: fresh.display_name().to_owned(),
                snapshot_value: snapshot.bed_count,
                current: fresh.bed_count,
            },
            Err(e) => {
                tracing::warn!(
                    facility_id = %snapshot.id,
                    error = %e,
                    "watch: facility fetch failed; using last known value"
                );
                Observation {
                    facility_id: snapshot.id.clone(),
                    name: snapshot.display_name().to_owned(),
                    snapshot_value: snapshot.bed_count,
                    current: None,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::records::{compare, Comparison, WatchRecords};
    use crate::test_support::{facility, MemoryFacilities};

    #[tokio::test]
    async fn observes_every_saved_facility_in_order() {
        let store = MemoryFacilities::default();
        store.set("a", 10);
        store.set("b", 20);
        let saved = vec![facility("b", Some(19)), facility("a", Some(10))];

        let observations = observe(&store, &saved).await;

        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(
            observations,
            vec![
                Observation {
                    facility_id: "b".to_owned(),
                    name: "Home b".to_owned(),
                    snapshot_value: Some(19),
                    current: Some(20),
                },
                Observation {
                    facility_id: "a".to_owned(),
                    name: "Home a".to_owned(),
                    snapshot_value: Some(10),
                    current: Some(10),
                },
            ]
        );
    }

    #[tokio::test]
    async fn large_saved_list_is_fetched_in_bounded_batches() {
        let store = MemoryFacilities::default();
        let saved: Vec<Facility> = (0..20)
            .map(|i| {
                let id = format!("f{i:02}");
                store.set(&id, i);
                facility(&id, Some(i))
            })
            .collect();

        let observations = observe(&store, &saved).await;

        assert_eq!(store.fetches.load(Ordering::SeqCst), 20);
        assert_eq!(
            store.peak_in_flight.load(Ordering::SeqCst),
            MAX_CONCURRENT_FETCHES
        );
        let ids: Vec<&str> = observations.iter().map(|o| o.facility_id.as_str()).collect();
        let expected: Vec<&str> = saved.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn one_failed_fetch_does_not_block_the_rest() {
        let store = MemoryFacilities::default();
        store.fail("broken");
        store.set("ok", 12);
        let saved = vec![facility("broken", Some(5)), facility("ok", Some(10))];

        let out = observe_and_compare(&store, saved, &WatchRecords::new()).await;

        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].facility_id, "ok");
        assert_eq!(out.records.get("broken"), Some(5));
        assert_eq!(out.records.get("ok"), Some(12));
    }

    #[tokio::test]
    async fn missing_facility_falls_back_like_a_failure() {
        let store = MemoryFacilities::default();
        let saved = vec![facility("deleted", Some(4))];

        let out = observe_and_compare(&store, saved, &WatchRecords::new()).await;
        assert!(out.changes.is_empty());
        assert_eq!(out.records.get("deleted"), Some(4));
    }

    async fn observe_and_compare(
        store: &MemoryFacilities,
        saved: Vec<Facility>,
        previous: &WatchRecords,
    ) -> Comparison {
        let observations = observe(store, &saved).await;
        compare(previous, &observations)
    }
}
