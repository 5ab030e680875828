use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ald_core::Facility;
use ald_store::{StoreError, UserStore};
use tokio::sync::Notify;

use super::*;
use crate::test_support::{MemoryFacilities, MemoryUsers};

const USER: &str = "user-1";

fn watcher(
    facilities: &Arc<MemoryFacilities>,
    users: &Arc<MemoryUsers>,
) -> ChangeWatcher<MemoryFacilities, MemoryUsers> {
    ChangeWatcher::new(
        Arc::clone(facilities),
        Arc::clone(users),
        USER,
        &WatchOptions::default(),
    )
}

fn stores() -> (Arc<MemoryFacilities>, Arc<MemoryUsers>) {
    (
        Arc::new(MemoryFacilities::default()),
        Arc::new(MemoryUsers::default()),
    )
}

async fn messages(board: &WatchBoard) -> Vec<String> {
    board
        .notifications()
        .await
        .into_iter()
        .map(|n| n.message)
        .collect()
}

#[tokio::test]
async fn change_from_ten_to_twelve_notifies_once() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 12);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();

    assert!(watcher.tick().await);
    assert_eq!(
        messages(&board).await,
        ["Home x: bed count changed from 10 to 12"]
    );
    assert_eq!(board.records().await.get("x"), Some(12));

    assert!(watcher.tick().await);
    assert_eq!(board.notifications().await.len(), 1);
}

#[tokio::test]
async fn identical_messages_across_cycles_stay_single() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();

    for beds in [12, 10, 12] {
        facilities.set("x", beds);
        watcher.tick().await;
    }

    assert_eq!(
        messages(&board).await,
        [
            "Home x: bed count changed from 12 to 10",
            "Home x: bed count changed from 10 to 12",
        ]
    );
}

#[tokio::test]
async fn log_is_bounded_to_capacity() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(0));
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();

    for beds in 1..=11 {
        facilities.set("x", beds);
        watcher.tick().await;
    }

    let live = messages(&board).await;
    assert_eq!(live.len(), 10);
    assert_eq!(live[0], "Home x: bed count changed from 10 to 11");
    assert!(!live.contains(&"Home x: bed count changed from 0 to 1".to_owned()));
}

#[tokio::test]
async fn dismiss_leaves_other_notifications_and_records() {
    let (facilities, users) = stores();
    users.save(USER, "a", Some(1));
    users.save(USER, "b", Some(1));
    facilities.set("a", 2);
    facilities.set("b", 3);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();
    watcher.tick().await;

    let before = board.notifications().await;
    assert_eq!(before.len(), 2);
    let records = board.records().await;

    assert!(board.dismiss(before[0].id).await);
    let after = board.notifications().await;
    assert_eq!(after, vec![before[1].clone()]);
    assert_eq!(board.records().await, records);
}

#[tokio::test]
async fn failed_fetch_keeps_last_known_value() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 12);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();
    watcher.tick().await;

    facilities.fail("x");
    assert!(watcher.tick().await);
    assert_eq!(board.records().await.get("x"), Some(12));
    assert_eq!(board.notifications().await.len(), 1);

    // Recovery compares against the value from before the failure.
    facilities.set("x", 12);
    watcher.tick().await;
    assert_eq!(board.notifications().await.len(), 1);
}

#[tokio::test]
async fn saved_list_failure_skips_the_cycle() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 10);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();
    watcher.tick().await;

    users.set_failing(true);
    facilities.set("x", 15);
    assert!(!watcher.tick().await);
    assert_eq!(board.records().await.get("x"), Some(10));
    assert_eq!(board.phase().await, WatchPhase::Idle);
    assert_eq!(board.completed_cycles().await, 1);

    users.set_failing(false);
    assert!(watcher.tick().await);
    assert_eq!(
        messages(&board).await,
        ["Home x: bed count changed from 10 to 15"]
    );
}

#[tokio::test]
async fn unsaved_facility_record_is_dropped() {
    let (facilities, users) = stores();
    users.save(USER, "a", Some(1));
    users.save(USER, "b", Some(2));
    facilities.set("a", 1);
    facilities.set("b", 2);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();
    watcher.tick().await;
    assert_eq!(board.records().await.len(), 2);

    users.unsave(USER, "b");
    watcher.tick().await;
    let records = board.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records.get("b"), None);
}

#[tokio::test]
async fn tick_after_teardown_does_nothing() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 12);
    let watcher = watcher(&facilities, &users);
    let board = watcher.board();

    watcher.teardown().await;
    assert!(!watcher.tick().await);
    assert!(!board.is_mounted().await);
    assert_eq!(facilities.fetches.load(Ordering::SeqCst), 0);
    assert!(board.notifications().await.is_empty());
}

/// Saved-list reads block until released.
struct GatedUsers {
    inner: MemoryUsers,
    gate: Notify,
}

impl UserStore for GatedUsers {
    async fn saved_facilities(&self, user_id: &str) -> Result<Vec<Facility>, StoreError> {
        self.gate.notified().await;
        self.inner.saved_facilities(user_id).await
    }

    async fn add_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        self.inner.add_saved(user_id, facility_id).await
    }

    async fn remove_saved(&self, user_id: &str, facility_id: &str) -> Result<(), StoreError> {
        self.inner.remove_saved(user_id, facility_id).await
    }
}

#[tokio::test]
async fn cycle_in_flight_at_teardown_is_discarded() {
    let facilities = Arc::new(MemoryFacilities::default());
    facilities.set("x", 12);
    let users = Arc::new(GatedUsers {
        inner: MemoryUsers::default(),
        gate: Notify::new(),
    });
    users.inner.save(USER, "x", Some(10));

    let watcher = ChangeWatcher::new(
        Arc::clone(&facilities),
        Arc::clone(&users),
        USER,
        &WatchOptions::default(),
    );
    let board = watcher.board();

    let in_flight = tokio::spawn({
        let watcher = watcher.clone();
        async move { watcher.tick().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(board.phase().await, WatchPhase::Fetching);

    watcher.teardown().await;
    users.gate.notify_one();

    assert!(!in_flight.await.unwrap());
    assert!(board.notifications().await.is_empty());
    assert!(board.records().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn mount_polls_every_interval() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 10);
    let handle = watcher(&facilities, &users).spawn();

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(handle.board().completed_cycles().await, 1, "first cycle on mount");

    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(handle.board().completed_cycles().await, 4);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_notifications_after_teardown() {
    let (facilities, users) = stores();
    users.save(USER, "x", Some(10));
    facilities.set("x", 10);
    let handle = watcher(&facilities, &users).spawn();
    let board = handle.board().clone();

    tokio::time::sleep(Duration::from_millis(1)).await;
    facilities.set("x", 12);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(board.notifications().await.len(), 1);

    handle.shutdown().await;
    let fetches = facilities.fetches.load(Ordering::SeqCst);

    facilities.set("x", 20);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(board.notifications().await.len(), 1);
    assert_eq!(facilities.fetches.load(Ordering::SeqCst), fetches);
    assert!(!board.is_mounted().await);
}
