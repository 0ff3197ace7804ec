//! Queries for the partition_audit table.

use chrono::NaiveDate;
use keeper_core::errors::StorageError;
use keeper_core::models::{PartitionAction, PartitionAuditEntry, PeriodRange};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{corrupt, from_millis, sql_err, to_millis};

pub fn insert_entry(conn: &Connection, entry: &PartitionAuditEntry) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO partition_audit
            (run_id, entity, partition_name, action, range_start, range_end,
             size_bytes, detail, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.run_id.map(|id| id.to_string()),
            entry.entity,
            entry.partition,
            entry.action.as_str(),
            entry.range.start.to_string(),
            entry.range.end.to_string(),
            entry.size_bytes as i64,
            entry.detail,
            to_millis(entry.recorded_at),
        ],
    )
    .map_err(sql_err)?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn query_for_entity(
    conn: &Connection,
    entity: &str,
    limit: usize,
) -> Result<Vec<PartitionAuditEntry>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT run_id, entity, partition_name, action, range_start, range_end,
                    size_bytes, detail, recorded_at
             FROM partition_audit WHERE entity = ?1
             ORDER BY recorded_at DESC, id DESC LIMIT ?2",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![entity, limit as i64], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, i64>(8)?,
            ))
        })
        .map_err(sql_err)?;

    let mut entries = Vec::new();
    for row in rows {
        let (run_id, entity, partition, action, start, end, size, detail, recorded_at) =
            row.map_err(sql_err)?;
        let run_id = match run_id {
            Some(id) => Some(Uuid::parse_str(&id).map_err(|_| corrupt("run_id", &id))?),
            None => None,
        };
        entries.push(PartitionAuditEntry {
            run_id,
            entity,
            partition,
            action: PartitionAction::parse(&action).ok_or_else(|| corrupt("action", &action))?,
            range: PeriodRange::new(parse_date("range_start", &start)?, parse_date("range_end", &end)?),
            size_bytes: size.max(0) as u64,
            detail,
            recorded_at: from_millis(recorded_at),
        });
    }
    Ok(entries)
}

fn parse_date(column: &str, value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| corrupt(column, value))
}
