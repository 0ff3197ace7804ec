//! State database configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RUN_RETENTION_DAYS, DEFAULT_STATE_DB, DEFAULT_STATE_RETENTION_DAYS};

/// Where keeper keeps its own run records, alerts and audit entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StateConfig {
    /// Path of the SQLite state database, relative to the project root
    /// unless absolute. Default: "keeper.db".
    pub path: Option<String>,
    /// Days of alerts and index snapshots to keep. Default: 90.
    pub retention_days: Option<u32>,
    /// Days of finished run records to keep. Default: 365.
    pub run_retention_days: Option<u32>,
}

impl StateConfig {
    pub fn effective_path(&self, root: &Path) -> PathBuf {
        let path = PathBuf::from(self.path.as_deref().unwrap_or(DEFAULT_STATE_DB));
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }

    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(DEFAULT_STATE_RETENTION_DAYS)
    }

    pub fn effective_run_retention_days(&self) -> u32 {
        self.run_retention_days.unwrap_or(DEFAULT_RUN_RETENTION_DAYS)
    }
}
