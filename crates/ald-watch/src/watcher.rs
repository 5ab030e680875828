//! The polling loop and its shared state.
//!
//! Lifecycle: mount ([`ChangeWatcher::spawn`]) runs a cycle immediately and
//! then once per interval; teardown ([`WatcherHandle::shutdown`]) stops the
//! timer and marks the watcher unmounted so cycles still in flight discard
//! their results.

use std::sync::Arc;
use std::time::Duration;

use ald_store::{FacilityStore, UserStore};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::cycle::observe;
use crate::notifications::{Notification, NotificationLog, DEFAULT_CAPACITY};
use crate::records::{compare, Comparison, WatchRecords};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
    pub capacity: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchPhase {
    Idle,
    Fetching,
    Comparing,
}

#[derive(Debug)]
struct WatchState {
    records: WatchRecords,
    log: NotificationLog,
    phase: WatchPhase,
    mounted: bool,
    completed_cycles: u64,
}

/// Shared view of a watcher's records and notifications.
#[derive(Debug, Clone)]
pub struct WatchBoard {
    state: Arc<Mutex<WatchState>>,
}

impl WatchBoard {
    fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(WatchState {
                records: WatchRecords::new(),
                log: NotificationLog::new(capacity),
                phase: WatchPhase::Idle,
                mounted: true,
                completed_cycles: 0,
            })),
        }
    }

    /// Live notifications, newest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.log.to_vec()
    }

    /// Removes one notification. Records are untouched.
    pub async fn dismiss(&self, id: Uuid) -> bool {
        self.state.lock().await.log.dismiss(id)
    }

    pub async fn records(&self) -> WatchRecords {
        self.state.lock().await.records.clone()
    }

    pub async fn phase(&self) -> WatchPhase {
        self.state.lock().await.phase
    }

    pub async fn is_mounted(&self) -> bool {
        self.state.lock().await.mounted
    }

    pub async fn completed_cycles(&self) -> u64 {
        self.state.lock().await.completed_cycles
    }

    async fn unmount(&self) {
        let mut state = self.state.lock().await;
        state.mounted = false;
        state.phase = WatchPhase::Idle;
    }
}

/// Watches one user's saved facilities for bed-count changes.
pub struct ChangeWatcher<S, U> {
    facilities: Arc<S>,
    users: Arc<U>,
    user_id: String,
    interval: Duration,
    board: WatchBoard,
}

impl<S, U> Clone for ChangeWatcher<S, U> {
    fn clone(&self) -> Self {
        Self {
            facilities: Arc::clone(&self.facilities),
            users: Arc::clone(&self.users),
            user_id: self.user_id.clone(),
            interval: self.interval,
            board: self.board.clone(),
        }
    }
}

impl<S, U> ChangeWatcher<S, U>
where
    S: FacilityStore + 'static,
    U: UserStore + 'static,
{
    #[must_use]
    pub fn new(
        facilities: Arc<S>,
        users: Arc<U>,
        user_id: impl Into<String>,
        options: &WatchOptions,
    ) -> Self {
        Self {
            facilities,
            users,
            user_id: user_id.into(),
            interval: options.interval.max(MIN_INTERVAL),
            board: WatchBoard::new(options.capacity),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn board(&self) -> WatchBoard {
        self.board.clone()
    }

    /// Runs one watch cycle. Returns whether it completed and committed.
    ///
    /// A failed saved-list fetch skips the cycle with records intact. Results
    /// that arrive after teardown are dropped.
    pub async fn tick(&self) -> bool {
        {
            let mut state = self.board.state.lock().await;
            if !state.mounted {
                return false;
            }
            state.phase = WatchPhase::Fetching;
        }

        let saved = match self.users.saved_facilities(&self.user_id).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "watch: saved-facility fetch failed; skipping cycle"
                );
                let mut state = self.board.state.lock().await;
                if state.mounted {
                    state.phase = WatchPhase::Idle;
                }
                return false;
            }
        };
        let observations = observe(self.facilities.as_ref(), &saved).await;

        let mut state = self.board.state.lock().await;
        if !state.mounted {
            tracing::debug!(user_id = %self.user_id, "watch: discarding cycle finished after teardown");
            return false;
        }
        state.phase = WatchPhase::Comparing;

        let Comparison { records, changes } = compare(&state.records, &observations);
        for change in &changes {
            if let Some(notification) = state.log.push(change.message()) {
                tracing::info!(
                    user_id = %self.user_id,
                    facility_id = %change.facility_id,
                    notification_id = %notification.id,
                    before = change.before,
                    after = change.after,
                    "watch: bed count changed"
                );
            }
        }
        state.records = records;
        state.phase = WatchPhase::Idle;
        state.completed_cycles += 1;

        tracing::debug!(
            user_id = %self.user_id,
            saved = observations.len(),
            changes = changes.len(),
            "watch: cycle complete"
        );
        true
    }

    /// Marks the watcher unmounted. Later and in-flight cycles commit nothing.
    pub async fn teardown(&self) {
        self.board.unmount().await;
    }

    /// Mounts the watcher: one cycle now, then one per interval until
    /// [`WatcherHandle::shutdown`] (or the handle is dropped).
    #[must_use]
    pub fn spawn(self) -> WatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let board = self.board.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(
                user_id = %self.user_id,
                interval_secs = self.interval.as_secs(),
                "watch: started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }

            tracing::info!(user_id = %self.user_id, "watch: stopped");
        });

        WatcherHandle {
            board,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// A running watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    board: WatchBoard,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    #[must_use]
    pub fn board(&self) -> &WatchBoard {
        &self.board
    }

    /// Tears the watcher down and waits for its loop to exit.
    pub async fn shutdown(self) {
        self.board.unmount().await;
        // The receiver is gone only if the loop already exited.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "watch: loop ended abnormally");
        }
    }
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
