//! Queries for the maintenance_runs table.

use keeper_core::errors::StorageError;
use keeper_core::models::{MaintenanceRunRecord, MaintenanceTier, RunStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{corrupt, from_millis, json_err, sql_err, to_millis};

const SELECT_COLUMNS: &str = "SELECT run_id, maintenance_type, started_at, completed_at, status,
        phases_completed, failure_details, phase_outcomes, duration_ms
     FROM maintenance_runs";

/// Raw row, decoded into a record outside the rusqlite closure.
struct RunRow {
    run_id: String,
    maintenance_type: String,
    started_at: i64,
    completed_at: Option<i64>,
    status: String,
    phases_completed: String,
    failure_details: String,
    phase_outcomes: String,
    duration_ms: Option<i64>,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            maintenance_type: row.get(1)?,
            started_at: row.get(2)?,
            completed_at: row.get(3)?,
            status: row.get(4)?,
            phases_completed: row.get(5)?,
            failure_details: row.get(6)?,
            phase_outcomes: row.get(7)?,
            duration_ms: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<MaintenanceRunRecord, StorageError> {
        Ok(MaintenanceRunRecord {
            run_id: Uuid::parse_str(&self.run_id).map_err(|_| corrupt("run_id", &self.run_id))?,
            maintenance_type: MaintenanceTier::parse(&self.maintenance_type)
                .ok_or_else(|| corrupt("maintenance_type", &self.maintenance_type))?,
            started_at: from_millis(self.started_at),
            completed_at: self.completed_at.map(from_millis),
            status: RunStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?,
            phases_completed: serde_json::from_str(&self.phases_completed).map_err(json_err)?,
            failure_details: serde_json::from_str(&self.failure_details).map_err(json_err)?,
            phase_outcomes: serde_json::from_str(&self.phase_outcomes).map_err(json_err)?,
            duration_ms: self.duration_ms.map(|d| d.max(0) as u64),
        })
    }
}

/// Insert a run record. Returns `false` when `run_id` already exists
/// (the existing row is left untouched).
pub fn insert_run(conn: &Connection, record: &MaintenanceRunRecord) -> Result<bool, StorageError> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO maintenance_runs
                (run_id, maintenance_type, started_at, completed_at, status,
                 phases_completed, failure_details, phase_outcomes, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.run_id.to_string(),
                record.maintenance_type.as_str(),
                to_millis(record.started_at),
                record.completed_at.map(to_millis),
                record.status.as_str(),
                serde_json::to_string(&record.phases_completed).map_err(json_err)?,
                serde_json::to_string(&record.failure_details).map_err(json_err)?,
                serde_json::to_string(&record.phase_outcomes).map_err(json_err)?,
                record.duration_ms.map(|d| d as i64),
            ],
        )
        .map_err(sql_err)?;
    Ok(inserted == 1)
}

/// Write the terminal state of a run. Only a row still in 'running' is
/// updated, so a run is finalized at most once.
pub fn finalize_run(conn: &Connection, record: &MaintenanceRunRecord) -> Result<bool, StorageError> {
    let updated = conn
        .execute(
            "UPDATE maintenance_runs SET
                completed_at = ?1, status = ?2, phases_completed = ?3,
                failure_details = ?4, phase_outcomes = ?5, duration_ms = ?6
             WHERE run_id = ?7 AND status = 'running'",
            params![
                record.completed_at.map(to_millis),
                record.status.as_str(),
                serde_json::to_string(&record.phases_completed).map_err(json_err)?,
                serde_json::to_string(&record.failure_details).map_err(json_err)?,
                serde_json::to_string(&record.phase_outcomes).map_err(json_err)?,
                record.duration_ms.map(|d| d as i64),
                record.run_id.to_string(),
            ],
        )
        .map_err(sql_err)?;
    Ok(updated == 1)
}

pub fn get_run(conn: &Connection, run_id: &Uuid) -> Result<Option<MaintenanceRunRecord>, StorageError> {
    let sql = format!("{SELECT_COLUMNS} WHERE run_id = ?1");
    let row = conn
        .query_row(&sql, params![run_id.to_string()], RunRow::from_row)
        .optional()
        .map_err(sql_err)?;
    row.map(RunRow::into_record).transpose()
}

pub fn running_runs(conn: &Connection) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
    let sql = format!("{SELECT_COLUMNS} WHERE status = 'running' ORDER BY started_at ASC");
    query_runs(conn, &sql, params![])
}

pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY started_at DESC LIMIT ?1");
    query_runs(conn, &sql, params![limit as i64])
}

fn query_runs(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
    let mut stmt = conn.prepare_cached(sql).map_err(sql_err)?;
    let rows = stmt
        .query_map(params, RunRow::from_row)
        .map_err(sql_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_err)?;
    rows.into_iter().map(RunRow::into_record).collect()
}

/// Delete finished runs started before `cutoff_ms`. RUNNING rows are kept.
pub fn delete_finished_before(conn: &Connection, cutoff_ms: i64) -> Result<u64, StorageError> {
    conn.execute(
        "DELETE FROM maintenance_runs WHERE status != 'running' AND started_at < ?1",
        params![cutoff_ms],
    )
    .map(|n| n as u64)
    .map_err(sql_err)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM maintenance_runs", [], |row| row.get(0))
        .map_err(sql_err)
}
