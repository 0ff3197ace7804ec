//! Persistence of keeper's own records: runs, alerts, audit, refresh log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StorageError;
use crate::models::{
    AlertRecord, IndexHealthRecord, MaintenanceRunRecord, PartitionAuditEntry, Severity,
    ViewRefreshEntry,
};

/// Rows removed by one retention pass over the state database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimReport {
    pub runs_deleted: u64,
    pub alerts_deleted: u64,
    pub snapshots_deleted: u64,
    pub refresh_log_deleted: u64,
}

impl TrimReport {
    pub fn total(&self) -> u64 {
        self.runs_deleted + self.alerts_deleted + self.snapshots_deleted + self.refresh_log_deleted
    }
}

pub trait StateStore: Send + Sync {
    /// Persist a RUNNING record. Inserting an existing `run_id` is a no-op.
    fn insert_run(&self, record: &MaintenanceRunRecord) -> Result<(), StorageError>;

    /// Write the terminal state. Only a RUNNING record is updated; returns
    /// `false` when the run was already finalized.
    fn finalize_run(&self, record: &MaintenanceRunRecord) -> Result<bool, StorageError>;

    fn get_run(&self, run_id: &Uuid) -> Result<Option<MaintenanceRunRecord>, StorageError>;

    fn running_runs(&self) -> Result<Vec<MaintenanceRunRecord>, StorageError>;

    /// Newest first.
    fn recent_runs(&self, limit: usize) -> Result<Vec<MaintenanceRunRecord>, StorageError>;

    fn emit_alert(&self, alert: &AlertRecord) -> Result<(), StorageError>;

    /// Whether an alert with the same subject and message exists at or after `since`.
    fn recent_alert_exists(
        &self,
        subject: &str,
        message: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Newest first, optionally filtered to `min_severity` and above.
    fn recent_alerts(
        &self,
        limit: usize,
        min_severity: Option<Severity>,
    ) -> Result<Vec<AlertRecord>, StorageError>;

    fn record_partition_audit(&self, entry: &PartitionAuditEntry) -> Result<(), StorageError>;

    /// Newest first.
    fn partition_audit(
        &self,
        entity: &str,
        limit: usize,
    ) -> Result<Vec<PartitionAuditEntry>, StorageError>;

    fn record_view_refresh(&self, entry: &ViewRefreshEntry) -> Result<(), StorageError>;

    fn last_view_refresh(&self, view: &str) -> Result<Option<DateTime<Utc>>, StorageError>;

    fn record_index_snapshots(
        &self,
        run_id: Option<&Uuid>,
        records: &[IndexHealthRecord],
        taken_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Delete finished runs older than `run_days` and alerts, snapshots and
    /// refresh-log rows older than `state_days`. RUNNING records and the
    /// partition audit are never trimmed.
    fn trim_state(
        &self,
        now: DateTime<Utc>,
        state_days: u32,
        run_days: u32,
    ) -> Result<TrimReport, StorageError>;
}
