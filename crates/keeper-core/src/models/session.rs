//! Scoped session settings passed into every action.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds applied for the duration of one action and restored afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Maximum wait for the action's lock.
    pub lock_timeout: Duration,
    /// Maximum duration of the action itself; `None` leaves it unbounded.
    pub statement_timeout: Option<Duration>,
}

impl SessionSettings {
    pub fn new(lock_timeout: Duration, statement_timeout: Option<Duration>) -> Self {
        Self {
            lock_timeout,
            statement_timeout,
        }
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout.as_millis() as u64
    }

    pub fn statement_timeout_ms(&self) -> Option<u64> {
        self.statement_timeout.map(|d| d.as_millis() as u64)
    }
}
