//! Per-phase accounting and failure classification.

use keeper_core::errors::{ActionError, CatalogError, KeeperErrorCode, MaintenanceError};
use keeper_core::models::{FailureDetail, FailureKind, Phase};
use keeper_core::tracing::events;

/// Counters and failures accumulated by one phase (or one operation).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseReport {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub failures: Vec<FailureDetail>,
    /// Free-form summary kept on the phase outcome.
    pub note: Option<String>,
}

impl PhaseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Per-object failures count as failed; transient failures and guarded
    /// rejections count as skipped.
    pub fn record_failure(&mut self, detail: FailureDetail) {
        match detail.kind {
            FailureKind::PerObject | FailureKind::Fatal => self.failed += 1,
            FailureKind::Transient | FailureKind::SafetyViolation => self.skipped += 1,
        }
        events::action_failed(&detail.object, detail.kind.as_str(), &detail.message);
        self.failures.push(detail);
    }

    /// Record a failure without touching the counters. Used for notes that
    /// accompany an action counted elsewhere (e.g. a guarded rejection
    /// followed by an in-place rebuild).
    pub fn record_note(&mut self, detail: FailureDetail) {
        events::action_failed(&detail.object, detail.kind.as_str(), &detail.message);
        self.failures.push(detail);
    }

    pub fn merge(&mut self, other: PhaseReport) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        if self.note.is_none() {
            self.note = other.note;
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Turn an action error into a failure detail, or into a fatal error when
/// the connection to the store is gone.
pub fn classify_action(
    phase: Phase,
    object: &str,
    err: ActionError,
) -> Result<FailureDetail, MaintenanceError> {
    if err.is_connection_loss() {
        return Err(MaintenanceError::Action(err));
    }
    let kind = if err.is_transient() {
        FailureKind::Transient
    } else if matches!(err, ActionError::SafetyViolation { .. }) {
        FailureKind::SafetyViolation
    } else {
        FailureKind::PerObject
    };
    Ok(FailureDetail::new(phase, object, kind, err.to_string())
        .with_context(serde_json::json!({ "error_code": err.error_code() })))
}

/// Catalog counterpart of [`classify_action`].
pub fn classify_catalog(
    phase: Phase,
    object: &str,
    err: CatalogError,
) -> Result<FailureDetail, MaintenanceError> {
    if err.is_connection_loss() {
        return Err(MaintenanceError::Catalog(err));
    }
    Ok(
        FailureDetail::new(phase, object, FailureKind::PerObject, err.to_string())
            .with_context(serde_json::json!({ "error_code": err.error_code() })),
    )
}
