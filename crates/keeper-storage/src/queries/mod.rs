//! SQL for each state table. Functions take a `&Connection` so the engine
//! decides whether they run on the writer or a pooled reader.

pub mod alerts;
pub mod index_snapshots;
pub mod partition_audit;
pub mod run_records;
pub mod view_refresh;

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;

pub(crate) fn sql_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

pub(crate) fn json_err(e: serde_json::Error) -> StorageError {
    StorageError::SqliteError {
        message: format!("json column: {e}"),
    }
}

pub(crate) fn corrupt(column: &str, value: &str) -> StorageError {
    StorageError::SqliteError {
        message: format!("unexpected value {value:?} in column {column}"),
    }
}

/// Timestamps are stored as Unix milliseconds.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
