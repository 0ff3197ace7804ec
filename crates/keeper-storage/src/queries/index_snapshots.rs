//! Queries for the index_snapshots table.

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;
use keeper_core::models::IndexHealthRecord;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{sql_err, to_millis};

/// A stored snapshot row.
#[derive(Debug, Clone)]
pub struct IndexSnapshotRow {
    pub index_name: String,
    pub table_name: String,
    pub access_method: String,
    pub current_size_bytes: i64,
    pub estimated_ideal_size_bytes: i64,
    pub bloat_pct: f64,
    pub scan_count: i64,
    pub flagged: bool,
    pub taken_at: i64,
}

pub fn insert_snapshots(
    conn: &Connection,
    run_id: Option<&Uuid>,
    records: &[IndexHealthRecord],
    taken_at: DateTime<Utc>,
) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO index_snapshots
                (run_id, index_name, table_name, access_method, current_size_bytes,
                 estimated_ideal_size_bytes, bloat_pct, scan_count, constraint_backing,
                 flagged, taken_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .map_err(sql_err)?;
    let run_id = run_id.map(|id| id.to_string());
    let taken_at = to_millis(taken_at);
    for record in records {
        stmt.execute(params![
            run_id,
            record.index_name(),
            record.table_name(),
            record.access_method.as_str(),
            record.current_size_bytes as i64,
            record.estimated_ideal_size_bytes as i64,
            record.bloat_pct,
            record.scan_count as i64,
            record.constraint_backing,
            record.flagged,
            taken_at,
        ])
        .map_err(sql_err)?;
    }
    Ok(records.len())
}

/// Newest snapshots of one index.
pub fn history(conn: &Connection, index_name: &str, limit: usize) -> Result<Vec<IndexSnapshotRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT index_name, table_name, access_method, current_size_bytes,
                    estimated_ideal_size_bytes, bloat_pct, scan_count, flagged, taken_at
             FROM index_snapshots WHERE index_name = ?1
             ORDER BY taken_at DESC, id DESC LIMIT ?2",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![index_name, limit as i64], |row| {
            Ok(IndexSnapshotRow {
                index_name: row.get(0)?,
                table_name: row.get(1)?,
                access_method: row.get(2)?,
                current_size_bytes: row.get(3)?,
                estimated_ideal_size_bytes: row.get(4)?,
                bloat_pct: row.get(5)?,
                scan_count: row.get(6)?,
                flagged: row.get(7)?,
                taken_at: row.get(8)?,
            })
        })
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn delete_before(conn: &Connection, cutoff_ms: i64) -> Result<u64, StorageError> {
    conn.execute("DELETE FROM index_snapshots WHERE taken_at < ?1", params![cutoff_ms])
        .map(|n| n as u64)
        .map_err(sql_err)
}
