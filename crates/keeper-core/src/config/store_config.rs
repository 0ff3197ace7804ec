//! Store connection configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_APPLICATION_NAME, DEFAULT_CONNECT_TIMEOUT_SECS};

/// Connection settings for the managed PostgreSQL store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// libpq-style connection string or URL.
    pub url: Option<String>,
    /// application_name reported to the store. Default: "keeper".
    pub application_name: Option<String>,
    /// Connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: Option<u64>,
    /// Tablespace that receives archived partitions.
    pub archive_tablespace: Option<String>,
}

impl StoreConfig {
    pub fn effective_application_name(&self) -> String {
        self.application_name
            .clone()
            .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string())
    }

    pub fn effective_connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }
}
