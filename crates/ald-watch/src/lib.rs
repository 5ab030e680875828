//! Saved-facility change watching.
//!
//! A [`ChangeWatcher`] polls one user's saved facilities on a fixed interval,
//! compares each facility's bed count with the value observed on the previous
//! cycle ([`WatchRecords`]), and keeps a bounded, deduplicated
//! [`NotificationLog`] of the changes it sees.

pub mod cycle;
pub mod notifications;
pub mod records;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use cycle::{observe, Observation, MAX_CONCURRENT_FETCHES};
pub use notifications::{Notification, NotificationLog, DEFAULT_CAPACITY};
pub use records::{compare, BedCountChange, Comparison, WatchRecords};
pub use watcher::{ChangeWatcher, WatchBoard, WatchOptions, WatchPhase, WatcherHandle};
