//! Queries for the view_refresh_log table.

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;
use keeper_core::models::ViewRefreshEntry;
use rusqlite::{params, Connection};

use super::{from_millis, sql_err, to_millis};

pub fn insert_refresh(conn: &Connection, entry: &ViewRefreshEntry) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO view_refresh_log (run_id, view_name, mode, refreshed_at, duration_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.run_id.map(|id| id.to_string()),
            entry.view,
            entry.mode.as_str(),
            to_millis(entry.refreshed_at),
            entry.duration_ms as i64,
        ],
    )
    .map_err(sql_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn last_refreshed_at(conn: &Connection, view: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
    let latest: Option<i64> = conn
        .query_row(
            "SELECT MAX(refreshed_at) FROM view_refresh_log WHERE view_name = ?1",
            params![view],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    Ok(latest.map(from_millis))
}

/// Delete old rows, always keeping the newest row of each view so its
/// staleness stays known.
pub fn delete_before(conn: &Connection, cutoff_ms: i64) -> Result<u64, StorageError> {
    conn.execute(
        "DELETE FROM view_refresh_log
         WHERE refreshed_at < ?1
           AND id NOT IN (
               SELECT id FROM view_refresh_log AS v
               WHERE v.refreshed_at = (
                   SELECT MAX(refreshed_at) FROM view_refresh_log
                   WHERE view_name = v.view_name
               )
           )",
        params![cutoff_ms],
    )
    .map(|n| n as u64)
    .map_err(sql_err)
}
