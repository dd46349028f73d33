//! Notification bridge: diff the set of sessions with unread user messages
//! across polling ticks.
//!
//! The admin feed calls [`NotificationBridge::observe`] each poll; sessions
//! newly entering the set are returned once so the console can fire a browser
//! notification. Sessions that stay unread across ticks are not re-reported.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct NotificationBridge {
    prev: HashSet<String>,
}

impl NotificationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the current unread set against the previous tick, store it, and
    /// return the newly unread session ids (sorted for stable output).
    pub fn observe(&mut self, current: HashSet<String>) -> Vec<String> {
        let mut fresh: Vec<String> = current.difference(&self.prev).cloned().collect();
        fresh.sort();
        self.prev = current;
        fresh
    }
}
