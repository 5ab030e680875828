//! Idle reclamation for server-held search sessions and watchers.
//!
//! A client that goes away without calling `DELETE` counts as unmounted once
//! its entry has been untouched for the configured TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ald_watch::WatcherHandle;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AppState, SharedSession};

/// Last client access, shared between a registry entry and its handlers.
#[derive(Debug, Clone)]
pub struct LastSeen(Arc<Mutex<Instant>>);

impl Default for LastSeen {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }
}

impl LastSeen {
    pub async fn touch(&self) {
        *self.0.lock().await = Instant::now();
    }

    async fn idle_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.0.lock().await)
    }
}

#[derive(Clone)]
pub struct SessionEntry {
    pub session: SharedSession,
    pub last_seen: LastSeen,
}

pub struct WatchEntry {
    pub handle: WatcherHandle,
    pub last_seen: LastSeen,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reclaimed {
    pub sessions: usize,
    pub watches: usize,
}

impl AppState {
    /// Drops sessions and tears down watchers idle for at least the TTL as of `now`.
    pub async fn reclaim_idle(&self, now: Instant) -> Reclaimed {
        let mut sessions = self.sessions.write().await;
        let mut idle_sessions: Vec<Uuid> = Vec::new();
        for (id, entry) in sessions.iter() {
            if entry.last_seen.idle_at(now).await >= self.idle_ttl {
                idle_sessions.push(*id);
            }
        }
        for id in &idle_sessions {
            sessions.remove(id);
            tracing::info!(session_id = %id, "idle search session dropped");
        }
        drop(sessions);

        let mut watches = self.watches.lock().await;
        let mut idle_users: Vec<String> = Vec::new();
        for (user_id, entry) in watches.iter() {
            if entry.last_seen.idle_at(now).await >= self.idle_ttl {
                idle_users.push(user_id.clone());
            }
        }
        let handles: Vec<(String, WatcherHandle)> = idle_users
            .into_iter()
            .filter_map(|user_id| watches.remove(&user_id).map(|e| (user_id, e.handle)))
            .collect();
        drop(watches);

        let reclaimed = Reclaimed {
            sessions: idle_sessions.len(),
            watches: handles.len(),
        };
        for (user_id, handle) in handles {
            handle.shutdown().await;
            tracing::info!(%user_id, "idle watch torn down");
        }
        reclaimed
    }
}
