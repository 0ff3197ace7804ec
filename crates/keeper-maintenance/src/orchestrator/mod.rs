//! The run state machine.
//!
//! `INITIATED → CLEANUP → STATS_UPDATE → INDEX_MAINTENANCE → VIEW_REFRESH →
//! PARTITION_MAINTENANCE → VACUUM → HEALTH_CHECK → COMPLETED`, with `FAILED`
//! reachable from any state. The tier picks which phases run; the order never
//! changes. Per-object failures are recorded and the run goes on; a fatal
//! error ends the run immediately with a critical alert.

pub mod lock;
pub mod plan;

use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use keeper_core::errors::{ActionError, CatalogError, KeeperErrorCode, MaintenanceError};
use keeper_core::events::{
    ActionFailedEvent, AlertEvent, EventDispatcher, PhaseCompletedEvent, RunFinishedEvent,
    RunStartedEvent,
};
use keeper_core::models::{
    AlertRecord, FailureDetail, FailureKind, MaintenanceRunRecord, MaintenanceTier, Phase,
    PhaseOutcome, RunStatus, SessionSettings, Severity, TargetDescriptor,
};
use keeper_core::traits::{Clock, MaintenanceBackend, StateStore};
use keeper_core::tracing::events;
use keeper_core::KeeperConfig;

use crate::bloat::IndexBloatAnalyzer;
use crate::collaborators::Collaborators;
use crate::health::HealthMonitor;
use crate::indexes::IndexMaintenanceExecutor;
use crate::partitions::PartitionLifecycleManager;
use crate::report::{classify_action, classify_catalog, PhaseReport};
use crate::views::MaterializedViewRefresher;

pub use lock::{entity_lock_key, EntityLockGuard};
pub use plan::{EntityPlan, RunPlan};

pub struct MaintenanceOrchestrator<'a> {
    deps: Collaborators<'a>,
    config: &'a KeeperConfig,
    events: EventDispatcher,
}

impl<'a> MaintenanceOrchestrator<'a> {
    pub fn new(deps: Collaborators<'a>, config: &'a KeeperConfig) -> Self {
        Self {
            deps,
            config,
            events: EventDispatcher::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Execute one run of `tier` and return its finalized record.
    ///
    /// A run that ends FAILED is still `Ok`; `Err` means the state store
    /// could not record the run at all.
    pub fn run(&self, tier: MaintenanceTier) -> Result<MaintenanceRunRecord, MaintenanceError> {
        let mut record = MaintenanceRunRecord::begin(tier, self.deps.clock.now());
        self.deps.state.insert_run(&record)?;
        let run_id = record.run_id.to_string();
        events::run_started(&run_id, tier.as_str());
        self.events.emit_run_started(&RunStartedEvent {
            run_id: run_id.clone(),
            tier,
        });

        let phases = tier.phases();
        let plan = match RunPlan::build(self.deps, self.config) {
            Ok(plan) => plan,
            Err(err) => return self.abort(record, Phase::Initiated, &phases, err),
        };
        for failure in &plan.failures {
            self.push_failure(&mut record, failure.clone());
        }
        for (idx, phase) in phases.iter().copied().enumerate() {
            let started_at = self.deps.clock.now();
            let started = Instant::now();
            let mut report = PhaseReport::new();
            let result = self.run_phase(phase, &plan, record.run_id, started_at, &mut report);
            let completed = result.is_ok();
            self.record_phase(&mut record, phase, started_at, started, report, completed);
            if let Err(err) = result {
                drop(plan);
                return self.abort(record, phase, &phases[idx + 1..], err);
            }
        }
        drop(plan);

        record.finish(RunStatus::Completed, self.deps.clock.now());
        self.finalize(&record)?;
        Ok(record)
    }

    /// Execute one phase, accumulating into `report`. Whatever the phase
    /// recorded before a fatal error stays in `report`.
    fn run_phase(
        &self,
        phase: Phase,
        plan: &RunPlan<'_>,
        run_id: Uuid,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        match phase {
            Phase::Initiated => Ok(()),
            Phase::Cleanup => self.cleanup(now, report),
            Phase::StatsUpdate => {
                self.per_entity(phase, plan, report, |backend, entity, settings| {
                    backend.analyze(entity, settings)
                })
            }
            Phase::IndexMaintenance => self.index_maintenance(plan, run_id, now, report),
            Phase::ViewRefresh => {
                MaterializedViewRefresher::new(
                    self.deps,
                    self.config.views.clone(),
                    self.config.timeouts.clone(),
                )
                .with_run(run_id)
                .refresh_all_into(now, report)
            }
            Phase::PartitionMaintenance => self.partition_maintenance(plan, run_id, now, report),
            Phase::Vacuum => {
                self.per_entity(phase, plan, report, |backend, entity, settings| {
                    backend.vacuum(entity, settings)
                })
            }
            Phase::HealthCheck => self.health_check(run_id, report),
        }
    }

    /// Clear invalid index leftovers and trim keeper's own state tables.
    fn cleanup(
        &self,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let executor = IndexMaintenanceExecutor::new(
            self.deps,
            &self.config.bloat,
            self.config.timeouts.clone(),
        );
        executor.drop_invalid_indexes_into(Phase::Cleanup, report)?;
        match self.deps.state.trim_state(
            now,
            self.config.state.effective_retention_days(),
            self.config.state.effective_run_retention_days(),
        ) {
            Ok(trimmed) => {
                report.record_success();
                report.note = Some(format!("{} state rows trimmed", trimmed.total()));
            }
            Err(err) => report.record_failure(FailureDetail::new(
                Phase::Cleanup,
                "state",
                FailureKind::PerObject,
                format!("state retention failed: {err}"),
            )),
        }
        Ok(())
    }

    /// Run `action` on every entity this run holds; entities held by another
    /// run are skipped as transient.
    fn per_entity<F>(
        &self,
        phase: Phase,
        plan: &RunPlan<'_>,
        report: &mut PhaseReport,
        action: F,
    ) -> Result<(), MaintenanceError>
    where
        F: Fn(&dyn MaintenanceBackend, &TargetDescriptor, &SessionSettings) -> Result<(), ActionError>,
    {
        skip_foreign(phase, plan, report);
        let settings = self.config.timeouts.housekeeping_session();
        for entity_plan in plan.held() {
            let object = entity_plan.entity.qualified_name();
            match action(self.deps.backend, &entity_plan.entity, &settings) {
                Ok(()) => report.record_success(),
                Err(err) => report.record_failure(classify_action(phase, &object, err)?),
            }
        }
        Ok(())
    }

    fn index_maintenance(
        &self,
        plan: &RunPlan<'_>,
        run_id: Uuid,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let phase = Phase::IndexMaintenance;
        let stats = match self.deps.catalog.index_stats() {
            Ok(stats) => stats,
            Err(err) => {
                report.record_failure(classify_catalog(phase, "index_stats", err)?);
                return Ok(());
            }
        };

        let analyzer = IndexBloatAnalyzer::new(&self.config.bloat);
        let snapshot = analyzer.health_view(&stats);
        if let Err(err) = self
            .deps
            .state
            .record_index_snapshots(Some(&run_id), &snapshot, now)
        {
            tracing::warn!(error = %err, "index health snapshot not recorded");
        }

        let mut candidates = Vec::new();
        for record in analyzer.candidates(&stats) {
            if plan.foreign_tables.contains(&record.table_name()) {
                report.record_failure(FailureDetail::new(
                    phase,
                    record.index_name(),
                    FailureKind::Transient,
                    "owning entity is locked by another run",
                ));
            } else {
                candidates.push(record);
            }
        }

        let executor = IndexMaintenanceExecutor::new(
            self.deps,
            &self.config.bloat,
            self.config.timeouts.clone(),
        );
        executor.rebuild_all_into(&candidates, report)
    }

    fn partition_maintenance(
        &self,
        plan: &RunPlan<'_>,
        run_id: Uuid,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let phase = Phase::PartitionMaintenance;
        for policy in &plan.unmatched {
            report.record_failure(FailureDetail::new(
                phase,
                policy.qualified_entity(),
                FailureKind::PerObject,
                "partitioned entity not found in catalog",
            ));
        }
        skip_foreign(phase, plan, report);

        let manager =
            PartitionLifecycleManager::new(self.deps, self.config.timeouts.clone()).with_run(run_id);
        for entity_plan in plan.held() {
            manager.apply_policy_into(&entity_plan.entity, &entity_plan.policy, now, report)?;
        }
        Ok(())
    }

    fn health_check(
        &self,
        run_id: Uuid,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let health = HealthMonitor::new(self.deps, self.config)
            .with_events(self.events.clone())
            .check_excluding(Some(run_id))?;
        if health.connection_lost {
            return Err(CatalogError::ConnectionLost {
                message: "catalog connection lost during health check".to_string(),
            }
            .into());
        }
        report.record_success();
        report.note = Some(format!(
            "{}: {} alerts emitted, {} suppressed",
            health.overall_status.as_str(),
            health.alerts_emitted,
            health.alerts_suppressed
        ));
        Ok(())
    }

    /// Add the phase's counters and failures to the run record. A phase
    /// cut short by a fatal error keeps its partial outcome but is not
    /// listed as completed.
    fn record_phase(
        &self,
        record: &mut MaintenanceRunRecord,
        phase: Phase,
        started_at: DateTime<Utc>,
        started: Instant,
        report: PhaseReport,
        completed: bool,
    ) {
        let run_id = record.run_id.to_string();
        let mut outcome = PhaseOutcome::new(phase, started_at);
        outcome.duration_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        outcome.succeeded = report.succeeded;
        outcome.failed = report.failed;
        outcome.skipped = report.skipped;
        outcome.note = if completed {
            report.note
        } else {
            Some("interrupted by fatal error".to_string())
        };

        for failure in report.failures {
            self.push_failure(record, failure);
        }
        record.phase_outcomes.push(outcome.clone());
        if !completed {
            return;
        }
        events::phase_completed(
            &run_id,
            phase.as_str(),
            outcome.succeeded,
            outcome.failed,
            outcome.skipped,
        );
        self.events.emit_phase_completed(&PhaseCompletedEvent { run_id, outcome });
        record.phases_completed.push(phase);
    }

    fn push_failure(&self, record: &mut MaintenanceRunRecord, failure: FailureDetail) {
        self.events.emit_action_failed(&ActionFailedEvent {
            run_id: record.run_id.to_string(),
            failure: failure.clone(),
        });
        record.failure_details.push(failure);
    }

    /// End the run as FAILED: record the fatal error, skip the remaining
    /// phases, emit a critical alert without cooldown, finalize.
    fn abort(
        &self,
        mut record: MaintenanceRunRecord,
        failed_phase: Phase,
        skipped: &[Phase],
        err: MaintenanceError,
    ) -> Result<MaintenanceRunRecord, MaintenanceError> {
        let run_id = record.run_id.to_string();
        let failure = fatal_failure(&mut record, failed_phase, &err);
        self.events.emit_action_failed(&ActionFailedEvent {
            run_id: run_id.clone(),
            failure,
        });
        for phase in skipped {
            events::phase_skipped(&run_id, phase.as_str(), "run failed");
        }

        let now = self.deps.clock.now();
        record.finish(RunStatus::Failed, now);
        let alert = raise_failure_alert(self.deps.state, &record, failed_phase, &err, now);
        if let Some(alert) = alert {
            self.events.emit_alert(&AlertEvent { alert });
        }

        self.finalize(&record)?;
        Ok(record)
    }

    fn finalize(&self, record: &MaintenanceRunRecord) -> Result<(), MaintenanceError> {
        finalize_record(self.deps.state, record)?;
        self.events.emit_run_finished(&RunFinishedEvent {
            run_id: record.run_id.to_string(),
            status: record.status,
            phases_completed: record.phases_completed.clone(),
            duration_ms: record.duration_ms.unwrap_or(0),
        });
        Ok(())
    }
}

/// Record a run of `tier` that could not start, typically because the store
/// is unreachable or its connection is not configured. The run is persisted
/// FAILED at INITIATED and a critical alert is raised.
pub fn record_failed_start(
    state: &dyn StateStore,
    clock: &dyn Clock,
    tier: MaintenanceTier,
    err: &MaintenanceError,
) -> Result<MaintenanceRunRecord, MaintenanceError> {
    let mut record = MaintenanceRunRecord::begin(tier, clock.now());
    state.insert_run(&record)?;
    events::run_started(&record.run_id.to_string(), tier.as_str());

    fatal_failure(&mut record, Phase::Initiated, err);
    let now = clock.now();
    record.finish(RunStatus::Failed, now);
    raise_failure_alert(state, &record, Phase::Initiated, err, now);
    finalize_record(state, &record)?;
    Ok(record)
}

fn fatal_failure(
    record: &mut MaintenanceRunRecord,
    phase: Phase,
    err: &MaintenanceError,
) -> FailureDetail {
    let run_id = record.run_id.to_string();
    let failure = FailureDetail::new(phase, &run_id, FailureKind::Fatal, err.to_string())
        .with_context(serde_json::json!({ "error_code": err.error_code() }));
    events::action_failed(&run_id, FailureKind::Fatal.as_str(), &failure.message);
    record.failure_details.push(failure.clone());
    failure
}

/// Critical alert for a FAILED run, written without cooldown. Returns the
/// alert when it was persisted.
fn raise_failure_alert(
    state: &dyn StateStore,
    record: &MaintenanceRunRecord,
    failed_phase: Phase,
    err: &MaintenanceError,
    now: DateTime<Utc>,
) -> Option<AlertRecord> {
    let run_id = record.run_id.to_string();
    let alert = AlertRecord::new(
        Severity::Critical,
        format!("run:{run_id}"),
        format!("maintenance run failed in {failed_phase}: {}", err.error_code()),
        serde_json::json!({
            "maintenance_type": record.maintenance_type.as_str(),
            "error": err.to_string(),
            "phases_completed": record.phases_completed,
        }),
        now,
    );
    match state.emit_alert(&alert) {
        Ok(()) => {
            events::alert_emitted(alert.severity.as_str(), &alert.subject, &alert.message);
            Some(alert)
        }
        Err(store_err) => {
            tracing::error!(
                run_id = %run_id,
                error = %store_err,
                "critical alert not persisted"
            );
            None
        }
    }
}

fn finalize_record(
    state: &dyn StateStore,
    record: &MaintenanceRunRecord,
) -> Result<(), MaintenanceError> {
    let run_id = record.run_id.to_string();
    if !state.finalize_run(record)? {
        tracing::warn!(run_id = %run_id, "run record was already finalized");
    }
    events::run_finished(
        &run_id,
        record.status.as_str(),
        record.duration_ms.unwrap_or(0),
        record.failure_details.len(),
    );
    Ok(())
}

fn skip_foreign(phase: Phase, plan: &RunPlan<'_>, report: &mut PhaseReport) {
    for entity_plan in plan.skipped() {
        report.record_failure(FailureDetail::new(
            phase,
            entity_plan.entity.qualified_name(),
            FailureKind::Transient,
            "entity is locked by another maintenance run",
        ));
    }
}
