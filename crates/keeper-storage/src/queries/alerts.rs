//! Queries for the alerts table: append-only feed.

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;
use keeper_core::models::{AlertRecord, Severity};
use rusqlite::{params, Connection};

use super::{corrupt, from_millis, json_err, sql_err, to_millis};

pub fn insert_alert(conn: &Connection, alert: &AlertRecord) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO alerts (severity, subject, message, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            alert.severity.as_str(),
            alert.subject,
            alert.message,
            serde_json::to_string(&alert.detail).map_err(json_err)?,
            to_millis(alert.created_at),
        ],
    )
    .map_err(sql_err)?;
    Ok(conn.last_insert_rowid())
}

/// Whether an identical alert was raised at or after `since`.
pub fn exists_since(
    conn: &Connection,
    subject: &str,
    message: &str,
    since: DateTime<Utc>,
) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM alerts WHERE subject = ?1 AND message = ?2 AND created_at >= ?3
         )",
        params![subject, message, to_millis(since)],
        |row| row.get(0),
    )
    .map_err(sql_err)
}

/// Newest first. `min_severity` keeps that level and above.
pub fn query_recent(
    conn: &Connection,
    limit: usize,
    min_severity: Option<Severity>,
) -> Result<Vec<AlertRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT severity, subject, message, detail, created_at
             FROM alerts ORDER BY created_at DESC, id DESC",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })
        .map_err(sql_err)?;

    let mut alerts = Vec::new();
    for row in rows {
        let (severity, subject, message, detail, created_at) = row.map_err(sql_err)?;
        let severity = Severity::parse(&severity).ok_or_else(|| corrupt("severity", &severity))?;
        if min_severity.is_some_and(|min| severity < min) {
            continue;
        }
        alerts.push(AlertRecord {
            severity,
            subject,
            message,
            detail: serde_json::from_str(&detail).map_err(json_err)?,
            created_at: from_millis(created_at),
        });
        if alerts.len() >= limit {
            break;
        }
    }
    Ok(alerts)
}

pub fn delete_before(conn: &Connection, cutoff_ms: i64) -> Result<u64, StorageError> {
    conn.execute("DELETE FROM alerts WHERE created_at < ?1", params![cutoff_ms])
        .map(|n| n as u64)
        .map_err(sql_err)
}
