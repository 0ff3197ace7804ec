//! Rebuild execution with a bounded concurrent attempt and an optional
//! blocking fallback.

use std::collections::BTreeMap;
use std::time::Instant;

use keeper_core::config::{BloatConfig, RebuildStrategy, TimeoutConfig};
use keeper_core::errors::{ActionError, KeeperErrorCode, MaintenanceError};
use keeper_core::models::{FailureDetail, FailureKind, IndexHealthRecord, Phase, SessionSettings};
use keeper_core::traits::ActionMode;
use keeper_core::tracing::events;

use crate::collaborators::Collaborators;
use crate::report::{classify_action, classify_catalog, PhaseReport};

const PHASE: Phase = Phase::IndexMaintenance;

/// What happened to one flagged index.
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOutcome {
    Rebuilt { mode: ActionMode, duration_ms: u64 },
    Recreated { duration_ms: u64 },
    /// Not rebuilt this run; retried on the next one.
    Deferred,
    Failed,
}

/// One attempt, kept for the failure context.
struct Attempt {
    mode: &'static str,
    error: ActionError,
}

pub struct IndexMaintenanceExecutor<'a> {
    deps: Collaborators<'a>,
    timeouts: TimeoutConfig,
    strategy: RebuildStrategy,
    blocking_fallback: bool,
}

impl<'a> IndexMaintenanceExecutor<'a> {
    pub fn new(deps: Collaborators<'a>, bloat: &BloatConfig, timeouts: TimeoutConfig) -> Self {
        Self {
            deps,
            timeouts,
            strategy: bloat.effective_rebuild_strategy(),
            blocking_fallback: bloat.effective_blocking_fallback(),
        }
    }

    /// Rebuild every record, grouped by owning table so that rebuilds on
    /// one relation never interleave with another.
    pub fn rebuild_all(
        &self,
        records: &[IndexHealthRecord],
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.rebuild_all_into(records, &mut report)?;
        Ok(report)
    }

    /// [`Self::rebuild_all`] accumulating into `report`. On a fatal error
    /// the outcomes of the indexes handled so far stay in `report`.
    pub fn rebuild_all_into(
        &self,
        records: &[IndexHealthRecord],
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let mut by_table: BTreeMap<String, Vec<&IndexHealthRecord>> = BTreeMap::new();
        for record in records {
            by_table.entry(record.table_name()).or_default().push(record);
        }

        for (table, mut group) in by_table {
            group.sort_by(|a, b| {
                b.bloat_pct
                    .partial_cmp(&a.bloat_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            tracing::debug!(table = %table, indexes = group.len(), "rebuilding index group");
            for record in group {
                self.rebuild(record, report)?;
            }
        }
        Ok(())
    }

    /// Rebuild one flagged index.
    ///
    /// The non-blocking path runs first under the concurrent duration bound.
    /// A lock timeout defers the index to the next run. Other failures fall
    /// back to a blocking rebuild under the shorter fallback bound, when the
    /// fallback is enabled. Constraint-backing indexes are only ever rebuilt
    /// in place.
    pub fn rebuild(
        &self,
        record: &IndexHealthRecord,
        report: &mut PhaseReport,
    ) -> Result<RebuildOutcome, MaintenanceError> {
        let object = record.index_name();
        let recreate = match self.strategy {
            RebuildStrategy::Recreate if record.constraint_backing => {
                let reason = "constraint-backing index is rebuilt in place only";
                events::guarded_rejection(&object, "recreate", reason);
                report.record_note(FailureDetail::new(
                    PHASE,
                    &object,
                    FailureKind::SafetyViolation,
                    reason,
                ));
                false
            }
            RebuildStrategy::Recreate => true,
            RebuildStrategy::InPlace => false,
        };

        let mut attempts = Vec::new();
        let concurrent = self.timeouts.concurrent_session();
        let started = Instant::now();
        let first = if recreate {
            self.deps.backend.recreate_index(&record.index, &concurrent)
        } else {
            self.deps
                .backend
                .rebuild_index(&record.index, ActionMode::Concurrent, &concurrent)
        };

        let err = match first {
            Ok(()) => {
                let duration_ms = elapsed_ms(started);
                report.record_success();
                return Ok(if recreate {
                    events::index_rebuilt(&object, "recreate", duration_ms);
                    RebuildOutcome::Recreated { duration_ms }
                } else {
                    events::index_rebuilt(&object, ActionMode::Concurrent.as_str(), duration_ms);
                    RebuildOutcome::Rebuilt {
                        mode: ActionMode::Concurrent,
                        duration_ms,
                    }
                });
            }
            Err(err) => err,
        };

        let fallback = self.blocking_fallback && err.allows_fallback();
        if !fallback {
            let detail = classify_action(PHASE, &object, err.clone())?;
            let deferred = detail.kind == FailureKind::Transient;
            attempts.push(Attempt {
                mode: if recreate { "recreate" } else { "concurrent" },
                error: err,
            });
            report.record_failure(self.with_attempts(detail, record, &attempts));
            return Ok(if deferred {
                RebuildOutcome::Deferred
            } else {
                RebuildOutcome::Failed
            });
        }

        events::fallback_engaged(&object, &err.to_string());
        attempts.push(Attempt {
            mode: if recreate { "recreate" } else { "concurrent" },
            error: err,
        });
        self.rebuild_blocking(record, &self.timeouts.fallback_session(), attempts, report)
    }

    fn rebuild_blocking(
        &self,
        record: &IndexHealthRecord,
        settings: &SessionSettings,
        mut attempts: Vec<Attempt>,
        report: &mut PhaseReport,
    ) -> Result<RebuildOutcome, MaintenanceError> {
        let object = record.index_name();
        let started = Instant::now();
        match self
            .deps
            .backend
            .rebuild_index(&record.index, ActionMode::Blocking, settings)
        {
            Ok(()) => {
                let duration_ms = elapsed_ms(started);
                events::index_rebuilt(&object, ActionMode::Blocking.as_str(), duration_ms);
                report.record_success();
                Ok(RebuildOutcome::Rebuilt {
                    mode: ActionMode::Blocking,
                    duration_ms,
                })
            }
            Err(err) => {
                let detail = classify_action(PHASE, &object, err.clone())?;
                let deferred = detail.kind == FailureKind::Transient;
                attempts.push(Attempt {
                    mode: ActionMode::Blocking.as_str(),
                    error: err,
                });
                report.record_failure(self.with_attempts(detail, record, &attempts));
                Ok(if deferred {
                    RebuildOutcome::Deferred
                } else {
                    RebuildOutcome::Failed
                })
            }
        }
    }

    fn with_attempts(
        &self,
        detail: FailureDetail,
        record: &IndexHealthRecord,
        attempts: &[Attempt],
    ) -> FailureDetail {
        let attempts: Vec<serde_json::Value> = attempts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "mode": a.mode,
                    "error_code": a.error.error_code(),
                    "message": a.error.to_string(),
                })
            })
            .collect();
        detail.merge_context(serde_json::json!({
            "index": record.index_name(),
            "table": record.table_name(),
            "bloat_pct": record.bloat_pct,
            "size_bytes": record.current_size_bytes,
            "attempts": attempts,
        }))
    }

    /// Drop indexes left invalid by an interrupted concurrent build.
    pub fn drop_invalid_indexes(&self, phase: Phase) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.drop_invalid_indexes_into(phase, &mut report)?;
        Ok(report)
    }

    pub fn drop_invalid_indexes_into(
        &self,
        phase: Phase,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let invalid = match self.deps.catalog.invalid_indexes() {
            Ok(invalid) => invalid,
            Err(err) => {
                report.record_failure(classify_catalog(phase, "invalid_indexes", err)?);
                return Ok(());
            }
        };
        let settings = self.timeouts.ddl_session();
        for index in invalid {
            let object = index.qualified_name();
            match self.deps.backend.drop_index(&index, &settings) {
                Ok(()) => {
                    tracing::info!(
                        event = "invalid_index_dropped",
                        index = %object,
                        "invalid index dropped"
                    );
                    report.record_success();
                }
                Err(err) => report.record_failure(classify_action(phase, &object, err)?),
            }
        }
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
