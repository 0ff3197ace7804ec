//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, 5s busy_timeout, foreign_keys ON.

use keeper_core::errors::StorageError;
use rusqlite::Connection;

pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

pub fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA query_only = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply read pragmas: {e}"),
    })
}

/// Whether WAL mode is active.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
