// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-facing notifications.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Shared notification log. Clones share the same log.
///
/// Every message is written to `tracing`; it is only kept in the log when
/// notifications are enabled.
#[derive(Debug, Clone)]
pub struct Notifications {
    log: Arc<Mutex<Vec<Notification>>>,
    enabled: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifications {
    pub fn new(enabled: bool) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            enabled,
        }
    }

    pub fn show_info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(notification = %message);
        self.push(Level::Info, message);
    }

    pub fn show_error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(notification = %message);
        self.push(Level::Error, message);
    }

    /// Snapshot of every notification so far, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        self.log.lock().expect("notification lock poisoned").clone()
    }

    /// Remove and return every notification.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.log.lock().expect("notification lock poisoned"))
    }

    fn push(&self, level: Level, message: String) {
        if !self.enabled {
            return;
        }
        self.log.lock().expect("notification lock poisoned").push(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_kept_in_order() {
        let notes = Notifications::default();
        notes.show_info("first");
        notes.show_error("second");
        let all = notes.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].level, Level::Info);
        assert_eq!(all[1].message, "second");
        assert!(all[0].at <= all[1].at);
    }

    #[test]
    fn clones_share_the_log_and_drain_empties_it() {
        let notes = Notifications::default();
        notes.clone().show_info("from a clone");
        assert_eq!(notes.drain().len(), 1);
        assert!(notes.all().is_empty());
    }

    #[test]
    fn disabled_log_stays_empty() {
        let notes = Notifications::new(false);
        notes.show_info("quiet");
        assert!(notes.all().is_empty());
    }
}
