//! Bounded, deduplicated notification log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Live notifications, newest first.
///
/// No two live entries share a message. Past `capacity` the oldest entry
/// (by insertion order) is evicted.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationLog {
    /// A zero `capacity` is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message` unless a live notification already carries it.
    ///
    /// Returns the new notification, or `None` for a duplicate.
    pub fn push(&mut self, message: impl Into<String>) -> Option<&Notification> {
        let message = message.into();
        if self.entries.iter().any(|n| n.message == message) {
            return None;
        }

        self.entries.push_front(Notification {
            id: Uuid::new_v4(),
            message,
            created_at: Utc::now(),
        });
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::debug!(id = %evicted.id, "notifications: evicted oldest entry");
            }
        }
        self.entries.front()
    }

    /// Removes the notification with `id`. Returns whether one was removed.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        match self.entries.iter().position(|n| n.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> + '_ {
        self.entries.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(log: &NotificationLog) -> Vec<&str> {
        log.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn newest_first() {
        let mut log = NotificationLog::default();
        log.push("one");
        log.push("two");
        log.push("three");
        assert_eq!(messages(&log), ["three", "two", "one"]);
    }

    #[test]
    fn identical_message_is_not_duplicated() {
        let mut log = NotificationLog::default();
        assert!(log.push("Home A: bed count changed from 10 to 12").is_some());
        assert!(log.push("Home A: bed count changed from 10 to 12").is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn dismissed_message_can_reappear() {
        let mut log = NotificationLog::default();
        let id = log.push("same").expect("pushed").id;
        assert!(log.dismiss(id));
        assert!(log.push("same").is_some());
    }

    #[test]
    fn eleventh_entry_evicts_exactly_the_oldest() {
        let mut log = NotificationLog::default();
        for i in 0..10 {
            log.push(format!("m{i}"));
        }
        assert_eq!(log.len(), 10);

        log.push("m10");
        assert_eq!(log.len(), 10);
        let live = messages(&log);
        assert!(!live.contains(&"m0"));
        assert!(live.contains(&"m1"));
        assert_eq!(live[0], "m10");
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut log = NotificationLog::new(3);
        for i in 0..50 {
            log.push(format!("m{i}"));
            assert!(log.len() <= 3);
        }
        assert_eq!(messages(&log), ["m49", "m48", "m47"]);
    }

    #[test]
    fn dismiss_removes_only_that_entry() {
        let mut log = NotificationLog::default();
        log.push("a");
        let b = log.push("b").expect("pushed").id;
        log.push("c");

        assert!(log.dismiss(b));
        assert_eq!(messages(&log), ["c", "a"]);
        assert!(!log.dismiss(b), "second dismiss is a no-op");
        assert!(!log.dismiss(Uuid::new_v4()));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn ids_are_unique() {
        let mut log = NotificationLog::default();
        let a = log.push("a").expect("pushed").id;
        let b = log.push("b").expect("pushed").id;
        assert_ne!(a, b);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut log = NotificationLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(messages(&log), ["b"]);
        assert_eq!(log.capacity(), 1);
    }
}
