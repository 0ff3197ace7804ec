//! Retention for keeper's own tables, run during the CLEANUP phase.
//!
//! - Finished run records: `run_days` (default 365).
//! - Alerts, index snapshots, refresh log: `state_days` (default 90).
//!   The newest refresh of each view is always kept.
//! - RUNNING run records and the partition audit are never trimmed.

use chrono::{DateTime, Duration, Utc};
use keeper_core::errors::StorageError;
use keeper_core::traits::TrimReport;
use rusqlite::Connection;

use crate::queries::{alerts, index_snapshots, run_records, sql_err, to_millis, view_refresh};

/// Apply retention inside a single transaction.
pub fn apply_retention(
    conn: &Connection,
    now: DateTime<Utc>,
    state_days: u32,
    run_days: u32,
) -> Result<TrimReport, StorageError> {
    let state_cutoff = cutoff_millis(now, state_days);
    let run_cutoff = cutoff_millis(now, run_days);

    // RAII transaction: rolls back on drop unless committed.
    let tx = conn.unchecked_transaction().map_err(|e| StorageError::SqliteError {
        message: format!("retention begin: {e}"),
    })?;

    let report = TrimReport {
        runs_deleted: run_records::delete_finished_before(&tx, run_cutoff)?,
        alerts_deleted: alerts::delete_before(&tx, state_cutoff)?,
        snapshots_deleted: index_snapshots::delete_before(&tx, state_cutoff)?,
        refresh_log_deleted: view_refresh::delete_before(&tx, state_cutoff)?,
    };

    tx.commit().map_err(sql_err)?;

    tracing::info!(
        event = "state_trimmed",
        runs = report.runs_deleted,
        alerts = report.alerts_deleted,
        snapshots = report.snapshots_deleted,
        refresh_log = report.refresh_log_deleted,
        "state database retention applied"
    );
    Ok(report)
}

/// `now - days` in epoch millis. A window reaching past the earliest
/// representable instant keeps everything.
fn cutoff_millis(now: DateTime<Utc>, days: u32) -> i64 {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .map(to_millis)
        .unwrap_or(i64::MIN)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use keeper_core::models::{AlertRecord, MaintenanceRunRecord, MaintenanceTier, RunStatus, Severity};

    use super::*;
    use crate::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn keeps_running_records_regardless_of_age() {
        let conn = conn();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let ancient = now - Duration::days(1000);

        let running = MaintenanceRunRecord::begin(MaintenanceTier::Daily, ancient);
        run_records::insert_run(&conn, &running).unwrap();

        let mut done = MaintenanceRunRecord::begin(MaintenanceTier::Daily, ancient);
        done.finish(RunStatus::Completed, ancient + Duration::minutes(5));
        run_records::insert_run(&conn, &done).unwrap();

        let report = apply_retention(&conn, now, 90, 365).unwrap();
        assert_eq!(report.runs_deleted, 1);
        assert_eq!(run_records::running_runs(&conn).unwrap().len(), 1);
    }

    #[test]
    fn trims_alerts_older_than_state_window() {
        let conn = conn();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        for days in [1, 100] {
            let alert = AlertRecord::new(
                Severity::Warning,
                "partition:public.events",
                "old",
                serde_json::Value::Null,
                now - Duration::days(days),
            );
            alerts::insert_alert(&conn, &alert).unwrap();
        }
        let report = apply_retention(&conn, now, 90, 365).unwrap();
        assert_eq!(report.alerts_deleted, 1);
        assert_eq!(alerts::query_recent(&conn, 10, None).unwrap().len(), 1);
    }

    #[test]
    fn oversized_window_keeps_everything() {
        let conn = conn();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let alert = AlertRecord::new(
            Severity::Warning,
            "partition:public.events",
            "old",
            serde_json::Value::Null,
            now - Duration::days(100),
        );
        alerts::insert_alert(&conn, &alert).unwrap();

        let report = apply_retention(&conn, now, u32::MAX, u32::MAX).unwrap();

        assert_eq!(report.alerts_deleted, 0);
        assert_eq!(report.runs_deleted, 0);
        assert_eq!(alerts::query_recent(&conn, 10, None).unwrap().len(), 1);
    }
}
