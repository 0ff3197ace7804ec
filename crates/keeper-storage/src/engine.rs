//! SqliteStateStore: implements `StateStore` over a `DatabaseManager`.

use std::path::Path;

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;
use keeper_core::models::{
    AlertRecord, IndexHealthRecord, MaintenanceRunRecord, PartitionAuditEntry, Severity,
    ViewRefreshEntry,
};
use keeper_core::traits::{StateStore, TrimReport};
use uuid::Uuid;

use crate::connection::DatabaseManager;
use crate::queries::{alerts, index_snapshots, partition_audit, run_records, sql_err, view_refresh};
use crate::retention;

/// The state database. Writes are serialized; reads use the pool when the
/// database is file-backed.
pub struct SqliteStateStore {
    db: DatabaseManager,
}

impl SqliteStateStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open_in_memory()?,
        })
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn index_history(
        &self,
        index_name: &str,
        limit: usize,
    ) -> Result<Vec<index_snapshots::IndexSnapshotRow>, StorageError> {
        self.db
            .with_reader(|conn| index_snapshots::history(conn, index_name, limit))
    }
}

impl StateStore for SqliteStateStore {
    fn insert_run(&self, record: &MaintenanceRunRecord) -> Result<(), StorageError> {
        let inserted = self.db.with_writer(|conn| run_records::insert_run(conn, record))?;
        if !inserted {
            tracing::debug!(run_id = %record.run_id, "run record already present");
        }
        Ok(())
    }

    fn finalize_run(&self, record: &MaintenanceRunRecord) -> Result<bool, StorageError> {
        let finalized = self.db.with_writer(|conn| run_records::finalize_run(conn, record))?;
        if !finalized {
            tracing::warn!(run_id = %record.run_id, "run record was already finalized");
        }
        Ok(finalized)
    }

    fn get_run(&self, run_id: &Uuid) -> Result<Option<MaintenanceRunRecord>, StorageError> {
        self.db.with_reader(|conn| run_records::get_run(conn, run_id))
    }

    fn running_runs(&self) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
        self.db.with_reader(run_records::running_runs)
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
        self.db.with_reader(|conn| run_records::recent_runs(conn, limit))
    }

    fn emit_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| alerts::insert_alert(conn, alert))
            .map(|_| ())
    }

    fn recent_alert_exists(
        &self,
        subject: &str,
        message: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        self.db
            .with_reader(|conn| alerts::exists_since(conn, subject, message, since))
    }

    fn recent_alerts(
        &self,
        limit: usize,
        min_severity: Option<Severity>,
    ) -> Result<Vec<AlertRecord>, StorageError> {
        self.db
            .with_reader(|conn| alerts::query_recent(conn, limit, min_severity))
    }

    fn record_partition_audit(&self, entry: &PartitionAuditEntry) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| partition_audit::insert_entry(conn, entry))
            .map(|_| ())
    }

    fn partition_audit(
        &self,
        entity: &str,
        limit: usize,
    ) -> Result<Vec<PartitionAuditEntry>, StorageError> {
        self.db
            .with_reader(|conn| partition_audit::query_for_entity(conn, entity, limit))
    }

    fn record_view_refresh(&self, entry: &ViewRefreshEntry) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| view_refresh::insert_refresh(conn, entry))
            .map(|_| ())
    }

    fn last_view_refresh(&self, view: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.db
            .with_reader(|conn| view_refresh::last_refreshed_at(conn, view))
    }

    fn record_index_snapshots(
        &self,
        run_id: Option<&Uuid>,
        records: &[IndexHealthRecord],
        taken_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }
        self.db.with_writer(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            index_snapshots::insert_snapshots(&tx, run_id, records, taken_at)?;
            tx.commit().map_err(sql_err)
        })
    }

    fn trim_state(
        &self,
        now: DateTime<Utc>,
        state_days: u32,
        run_days: u32,
    ) -> Result<TrimReport, StorageError> {
        let report = self
            .db
            .with_writer(|conn| retention::apply_retention(conn, now, state_days, run_days))?;
        if report.total() > 0 && self.db.path().is_some() {
            self.db.checkpoint()?;
        }
        Ok(report)
    }
}
