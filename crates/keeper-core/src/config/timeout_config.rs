//! Lock and duration bounds for mutating actions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONCURRENT_MAX_DURATION_SECS, DEFAULT_FALLBACK_MAX_DURATION_SECS,
    DEFAULT_LOCK_TIMEOUT_MS,
};
use crate::models::SessionSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Lock wait per action, in milliseconds. Default: 5000.
    pub lock_timeout_ms: Option<u64>,
    /// Duration bound of a concurrent rebuild or refresh. Default: 3600.
    pub concurrent_max_duration_secs: Option<u64>,
    /// Duration bound of a blocking fallback. Default: 300.
    pub fallback_max_duration_secs: Option<u64>,
}

impl TimeoutConfig {
    pub fn effective_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS))
    }

    pub fn effective_concurrent_max_duration(&self) -> Duration {
        Duration::from_secs(
            self.concurrent_max_duration_secs
                .unwrap_or(DEFAULT_CONCURRENT_MAX_DURATION_SECS),
        )
    }

    pub fn effective_fallback_max_duration(&self) -> Duration {
        Duration::from_secs(
            self.fallback_max_duration_secs
                .unwrap_or(DEFAULT_FALLBACK_MAX_DURATION_SECS),
        )
    }

    /// Settings for a non-blocking action.
    pub fn concurrent_session(&self) -> SessionSettings {
        SessionSettings::new(
            self.effective_lock_timeout(),
            Some(self.effective_concurrent_max_duration()),
        )
    }

    /// Settings for a blocking fallback: always duration-bounded.
    pub fn fallback_session(&self) -> SessionSettings {
        SessionSettings::new(
            self.effective_lock_timeout(),
            Some(self.effective_fallback_max_duration()),
        )
    }

    /// Settings for short DDL (create/drop/archive partition, drop index).
    pub fn ddl_session(&self) -> SessionSettings {
        SessionSettings::new(
            self.effective_lock_timeout(),
            Some(self.effective_fallback_max_duration()),
        )
    }

    /// Settings for ANALYZE and VACUUM: lock-bounded only.
    pub fn housekeeping_session(&self) -> SessionSettings {
        SessionSettings::new(self.effective_lock_timeout(), None)
    }
}
