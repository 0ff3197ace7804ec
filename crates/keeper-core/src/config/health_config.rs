//! Health monitor thresholds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_LOCK_WAIT_ALERT_SECS, DEFAULT_MAX_PARTITION_SIZE_BYTES,
    DEFAULT_MAX_RUN_DURATION_SECS,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Future periods checked for existence. Defaults to each policy's
    /// `future_periods`.
    pub lookahead_periods: Option<u32>,
    /// Default: 50 GiB.
    pub max_partition_size_bytes: Option<u64>,
    /// A RUNNING record older than this is stuck. Default: 6 hours.
    pub max_run_duration_secs: Option<u64>,
    /// Default: 30 seconds.
    pub lock_wait_alert_secs: Option<u64>,
    /// Identical alerts inside this window are suppressed. Default: 1 hour.
    pub alert_cooldown_secs: Option<u64>,
}

impl HealthConfig {
    pub fn effective_lookahead_periods(&self, policy_future_periods: u32) -> u32 {
        self.lookahead_periods.unwrap_or(policy_future_periods)
    }

    pub fn effective_max_partition_size_bytes(&self) -> u64 {
        self.max_partition_size_bytes
            .unwrap_or(DEFAULT_MAX_PARTITION_SIZE_BYTES)
    }

    pub fn effective_max_run_duration(&self) -> Duration {
        Duration::from_secs(
            self.max_run_duration_secs
                .unwrap_or(DEFAULT_MAX_RUN_DURATION_SECS),
        )
    }

    pub fn effective_lock_wait_alert_secs(&self) -> u64 {
        self.lock_wait_alert_secs
            .unwrap_or(DEFAULT_LOCK_WAIT_ALERT_SECS)
    }

    pub fn effective_alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs.unwrap_or(DEFAULT_ALERT_COOLDOWN_SECS))
    }
}
