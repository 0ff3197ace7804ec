//! A StateStore wrapper that can fail selected writes.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use keeper_core::errors::StorageError;
use keeper_core::models::{
    AlertRecord, IndexHealthRecord, MaintenanceRunRecord, PartitionAuditEntry, Severity,
    ViewRefreshEntry,
};
use keeper_core::traits::{StateStore, TrimReport};
use uuid::Uuid;

/// Delegates to `inner` unless a fault flag is set.
pub struct FaultyStateStore<S> {
    inner: S,
    fail_audit: AtomicBool,
    fail_view_log: AtomicBool,
}

impl<S: StateStore> FaultyStateStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_audit: AtomicBool::new(false),
            fail_view_log: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_partition_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_view_refresh_log(&self, fail: bool) {
        self.fail_view_log.store(fail, Ordering::SeqCst);
    }

    fn injected(what: &str) -> StorageError {
        StorageError::SqliteError {
            message: format!("injected failure: {what}"),
        }
    }
}

impl<S: StateStore> StateStore for FaultyStateStore<S> {
    fn insert_run(&self, record: &MaintenanceRunRecord) -> Result<(), StorageError> {
        self.inner.insert_run(record)
    }

    fn finalize_run(&self, record: &MaintenanceRunRecord) -> Result<bool, StorageError> {
        self.inner.finalize_run(record)
    }

    fn get_run(&self, run_id: &Uuid) -> Result<Option<MaintenanceRunRecord>, StorageError> {
        self.inner.get_run(run_id)
    }

    fn running_runs(&self) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
        self.inner.running_runs()
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<MaintenanceRunRecord>, StorageError> {
        self.inner.recent_runs(limit)
    }

    fn emit_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        self.inner.emit_alert(alert)
    }

    fn recent_alert_exists(
        &self,
        subject: &str,
        message: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        self.inner.recent_alert_exists(subject, message, since)
    }

    fn recent_alerts(
        &self,
        limit: usize,
        min_severity: Option<Severity>,
    ) -> Result<Vec<AlertRecord>, StorageError> {
        self.inner.recent_alerts(limit, min_severity)
    }

    fn record_partition_audit(&self, entry: &PartitionAuditEntry) -> Result<(), StorageError> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(Self::injected("partition audit"));
        }
        self.inner.record_partition_audit(entry)
    }

    fn partition_audit(
        &self,
        entity: &str,
        limit: usize,
    ) -> Result<Vec<PartitionAuditEntry>, StorageError> {
        self.inner.partition_audit(entity, limit)
    }

    fn record_view_refresh(&self, entry: &ViewRefreshEntry) -> Result<(), StorageError> {
        if self.fail_view_log.load(Ordering::SeqCst) {
            return Err(Self::injected("view refresh log"));
        }
        self.inner.record_view_refresh(entry)
    }

    fn last_view_refresh(&self, view: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.inner.last_view_refresh(view)
    }

    fn record_index_snapshots(
        &self,
        run_id: Option<&Uuid>,
        records: &[IndexHealthRecord],
        taken_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner.record_index_snapshots(run_id, records, taken_at)
    }

    fn trim_state(
        &self,
        now: DateTime<Utc>,
        state_days: u32,
        run_days: u32,
    ) -> Result<TrimReport, StorageError> {
        self.inner.trim_state(now, state_days, run_days)
    }
}
