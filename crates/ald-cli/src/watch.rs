//! Foreground change watch for one user.
//!
//! Runs the watcher's cycle on the configured interval and prints each new
//! notification as a JSON line.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ald_core::AppConfig;
use ald_watch::{ChangeWatcher, Notification, WatchOptions};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::build_backend;

pub(crate) async fn run_watch(
    config: &AppConfig,
    user_id: &str,
    cycles: Option<u32>,
) -> anyhow::Result<()> {
    let backend = Arc::new(build_backend(config)?);
    let options = WatchOptions {
        interval: Duration::from_secs(config.watch_interval_secs),
        capacity: config.notification_capacity,
    };
    let watcher = ChangeWatcher::new(Arc::clone(&backend), backend, user_id, &options);
    let board = watcher.board();

    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut printed: HashSet<Uuid> = HashSet::new();
    let mut completed = 0_u32;

    tracing::info!(
        user_id,
        interval_secs = options.interval.as_secs(),
        "watch: started"
    );

    loop {
        if cycles.is_some_and(|limit| completed >= limit) {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("watch: interrupted");
                break;
            }
            _ = ticker.tick() => {
                watcher.tick().await;
                completed += 1;
                let fresh = unseen(&board.notifications().await, &mut printed);
                for notification in fresh {
                    println!("{}", serde_json::to_string(&notification)?);
                }
            }
        }
    }

    watcher.teardown().await;
    tracing::info!(user_id, cycles = completed, "watch: stopped");
    Ok(())
}

/// Notifications not yet printed, oldest first.
fn unseen(live: &[Notification], printed: &mut HashSet<Uuid>) -> Vec<Notification> {
    let mut fresh: Vec<Notification> = live
        .iter()
        .filter(|n| printed.insert(n.id))
        .cloned()
        .collect();
    fresh.reverse();
    fresh
}
