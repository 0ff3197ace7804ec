//! End-to-end runs against the baseline catalog fixture.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use keeper_core::errors::{ActionError, CatalogError};
use keeper_core::events::{
    EventDispatcher, MaintenanceEventHandler, PhaseCompletedEvent, RunFinishedEvent,
};
use keeper_core::models::{
    FailureKind, MaintenanceTier, Phase, RelationKind, RetentionPolicy, RunStatus, Severity,
    TargetDescriptor,
};
use keeper_core::traits::{ActionMode, StateStore};
use keeper_core::KeeperConfig;
use keeper_maintenance::orchestrator::entity_lock_key;
use keeper_maintenance::{record_failed_start, Collaborators, MaintenanceOrchestrator};
use keeper_storage::SqliteStateStore;
use keeper_test_fixtures::{load_catalog, Op, SimulatedStore, TestClock};

fn policy(entity: &str) -> RetentionPolicy {
    RetentionPolicy {
        entity_type: entity.into(),
        schema: "public".into(),
        future_periods: 3,
        archive_after_months: 3,
        drop_after_months: 12,
    }
}

fn config() -> KeeperConfig {
    KeeperConfig {
        partitions: vec![policy("events"), policy("audit_log")],
        ..Default::default()
    }
}

struct Harness {
    store: SimulatedStore,
    state: SqliteStateStore,
    clock: TestClock,
}

impl Harness {
    fn baseline() -> Self {
        Self {
            store: load_catalog("catalog/baseline.json"),
            state: SqliteStateStore::open_in_memory().unwrap(),
            clock: TestClock::at(Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap()),
        }
    }

    fn orchestrator<'a>(&'a self, config: &'a KeeperConfig) -> MaintenanceOrchestrator<'a> {
        let deps = Collaborators::from_store(&self.store, &self.state, &self.clock);
        MaintenanceOrchestrator::new(deps, config)
    }
}

fn index_failure(target: &str) -> ActionError {
    ActionError::Failed {
        target: target.into(),
        message: "could not read block 4711".into(),
    }
}

#[test]
fn weekly_run_isolates_one_failing_rebuild() {
    let h = Harness::baseline();
    for mode in [ActionMode::Concurrent, ActionMode::Blocking] {
        h.store.fail_action(
            Op::RebuildIndex(mode),
            "public.events_tenant_idx",
            index_failure("public.events_tenant_idx"),
        );
    }
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Weekly).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.phases_completed, MaintenanceTier::Weekly.phases());
    assert!(record.phases_completed.contains(&Phase::IndexMaintenance));
    let per_object: Vec<_> = record.failures_of(FailureKind::PerObject).collect();
    assert_eq!(per_object.len(), 1, "{:?}", record.failure_details);
    assert_eq!(per_object[0].object, "public.events_tenant_idx");
    assert_eq!(per_object[0].phase, Phase::IndexMaintenance);
    assert!(record.failures_of(FailureKind::Fatal).next().is_none());

    let rebuilt: Vec<String> = h
        .store
        .actions()
        .into_iter()
        .filter(|a| matches!(a.op, Op::RebuildIndex(_)) && a.succeeded)
        .map(|a| a.target)
        .collect();
    assert_eq!(rebuilt.len(), 2);
    assert!(rebuilt.contains(&"public.events_created_at_idx".to_string()));
    assert!(rebuilt.contains(&"public.events_p2026_10_pkey".to_string()));
}

#[test]
fn weekly_run_performs_every_maintenance_task() {
    let h = Harness::baseline();
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Weekly).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert!(record.failure_details.is_empty(), "{:?}", record.failure_details);
    assert_eq!(
        h.store.partition_names("public.events"),
        vec![
            "events_p2026_05",
            "events_p2026_06",
            "events_p2026_07",
            "events_p2026_08",
            "events_p2026_09",
            "events_p2026_10",
            "events_p2026_11",
            "events_p2026_12",
            "events_p2027_01",
        ]
    );
    let archived: Vec<String> = h
        .store
        .actions_of(Op::Archive)
        .into_iter()
        .map(|a| a.target)
        .collect();
    assert_eq!(archived, vec!["public.events_p2026_05", "public.events_p2026_06"]);
    assert_eq!(h.store.invalid_index_count(), 0);
    assert_eq!(h.store.actions_of(Op::Analyze).len(), 2);
    assert_eq!(h.store.actions_of(Op::Vacuum).len(), 2);
    assert_eq!(
        h.store.actions_of(Op::RefreshView(ActionMode::Blocking))[0].target,
        "public.tenant_summary"
    );
    assert!(h
        .state
        .last_view_refresh("public.daily_rollup")
        .unwrap()
        .is_some());

    let audit = h.state.partition_audit("public.events", 20).unwrap();
    assert!(audit.iter().all(|e| e.run_id == Some(record.run_id)));
}

#[test]
fn daily_run_skips_index_maintenance() {
    let h = Harness::baseline();
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(
        record.phases_completed,
        vec![
            Phase::Cleanup,
            Phase::StatsUpdate,
            Phase::ViewRefresh,
            Phase::PartitionMaintenance,
            Phase::Vacuum,
            Phase::HealthCheck,
        ]
    );
    assert!(h
        .store
        .actions()
        .iter()
        .all(|a| !matches!(a.op, Op::RebuildIndex(_) | Op::RecreateIndex)));
}

#[test]
fn connection_loss_fails_the_run_and_raises_critical_alert() {
    let h = Harness::baseline();
    h.store.fail_action(
        Op::Analyze,
        "public.audit_log",
        ActionError::ConnectionLost {
            message: "terminating connection due to administrator command".into(),
        },
    );
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Weekly).unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.phases_completed, vec![Phase::Cleanup]);
    let fatal: Vec<_> = record.failures_of(FailureKind::Fatal).collect();
    assert_eq!(fatal.len(), 1);
    assert_eq!(fatal[0].phase, Phase::StatsUpdate);
    assert!(record.completed_at.is_some());

    let alerts = h.state.recent_alerts(10, Some(Severity::Critical)).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].subject, format!("run:{}", record.run_id));
    assert!(h.store.actions_of(Op::RefreshView(ActionMode::Concurrent)).is_empty());
    assert!(h.store.held_locks().is_empty(), "locks released on failure");

    let stored = h.state.get_run(&record.run_id).unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
}

#[test]
fn fatal_error_mid_phase_keeps_outcomes_recorded_before_it() {
    let h = Harness::baseline();
    for mode in [ActionMode::Concurrent, ActionMode::Blocking] {
        h.store.fail_action(
            Op::RebuildIndex(mode),
            "public.events_tenant_idx",
            index_failure("public.events_tenant_idx"),
        );
    }
    h.store.fail_action(
        Op::RebuildIndex(ActionMode::Concurrent),
        "public.events_p2026_10_pkey",
        ActionError::ConnectionLost {
            message: "server closed the connection unexpectedly".into(),
        },
    );
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Weekly).unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    let per_object: Vec<_> = record.failures_of(FailureKind::PerObject).collect();
    assert_eq!(per_object.len(), 1, "{:?}", record.failure_details);
    assert_eq!(per_object[0].object, "public.events_tenant_idx");
    assert_eq!(per_object[0].context["attempts"].as_array().unwrap().len(), 2);
    let fatal: Vec<_> = record.failures_of(FailureKind::Fatal).collect();
    assert_eq!(fatal.len(), 1);
    assert_eq!(fatal[0].phase, Phase::IndexMaintenance);

    assert!(!record.phases_completed.contains(&Phase::IndexMaintenance));
    let interrupted = record
        .phase_outcomes
        .iter()
        .find(|o| o.phase == Phase::IndexMaintenance)
        .expect("interrupted phase keeps its outcome");
    assert_eq!(interrupted.succeeded, 1, "events_created_at_idx was rebuilt");
    assert_eq!(interrupted.failed, 1);

    let stored = h.state.get_run(&record.run_id).unwrap().unwrap();
    let stored_objects: Vec<&str> = stored
        .failure_details
        .iter()
        .map(|f| f.object.as_str())
        .collect();
    assert!(stored_objects.contains(&"public.events_tenant_idx"));
    assert_eq!(stored.failure_details.len(), record.failure_details.len());
    assert_eq!(stored.phase_outcomes.len(), record.phase_outcomes.len());
}

#[test]
fn catalog_query_failure_defers_entity_work_without_failing() {
    let h = Harness::baseline();
    h.store.fail_catalog(CatalogError::QueryFailed {
        message: "canceling statement due to statement timeout".into(),
    });
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert!(record.failures_of(FailureKind::Fatal).next().is_none());
    let deferred: Vec<_> = record
        .failures_of(FailureKind::Transient)
        .filter(|f| f.phase == Phase::Initiated)
        .collect();
    assert_eq!(deferred.len(), 1);
    assert_eq!(deferred[0].object, "partitioned_entities");
    assert!(record
        .failure_details
        .iter()
        .all(|f| f.object != "public.events" && f.object != "public.audit_log"));
    assert!(h.store.actions().is_empty());
    assert!(h.store.held_locks().is_empty());

    let alerts = h.state.recent_alerts(10, Some(Severity::Critical)).unwrap();
    assert!(alerts.iter().any(|a| a.subject == "catalog"));
}

#[test]
fn partition_listing_failure_for_foreign_entity_is_per_object() {
    let h = Harness::baseline();
    let audit_log =
        TargetDescriptor::resolve("public", "audit_log", RelationKind::PartitionedTable).unwrap();
    h.store.hold_foreign_lock(&entity_lock_key(&audit_log));
    h.store.fail_partition_listing(
        "public.audit_log",
        CatalogError::QueryFailed {
            message: "canceling statement due to statement timeout".into(),
        },
    );
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    let gaps: Vec<_> = record
        .failures_of(FailureKind::PerObject)
        .filter(|f| f.phase == Phase::Initiated)
        .collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].object, "public.audit_log");
    assert_eq!(gaps[0].context["error_code"], "CATALOG_ERROR");
    assert!(h
        .store
        .actions()
        .iter()
        .all(|a| !a.target.starts_with("public.audit_log")));
    assert!(h
        .store
        .actions_of(Op::CreatePartition)
        .iter()
        .all(|a| a.target.starts_with("public.events")));
}

#[test]
fn unreachable_store_is_recorded_as_failed_run_with_alert() {
    let state = SqliteStateStore::open_in_memory().unwrap();
    let clock = TestClock::at(Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap());
    let err = CatalogError::QueryFailed {
        message: "store.url is not configured".into(),
    };

    let record =
        record_failed_start(&state, &clock, MaintenanceTier::Daily, &err.into()).unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.phases_completed.is_empty());
    assert_eq!(record.failure_details.len(), 1);
    assert_eq!(record.failure_details[0].phase, Phase::Initiated);
    assert_eq!(record.failure_details[0].kind, FailureKind::Fatal);
    assert!(record.failure_details[0].message.contains("store.url"));

    let stored = state.get_run(&record.run_id).unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(state.running_runs().unwrap().is_empty());
    let alerts = state.recent_alerts(10, Some(Severity::Critical)).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].subject, format!("run:{}", record.run_id));
}

#[test]
fn catalog_entity_without_policy_fails_before_any_work() {
    let h = Harness::baseline();
    let config = KeeperConfig {
        partitions: vec![policy("events")],
        ..Default::default()
    };

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.phases_completed.is_empty());
    assert_eq!(record.failure_details[0].phase, Phase::Initiated);
    assert!(h.store.actions().is_empty());
    assert!(h.store.held_locks().is_empty());
}

#[test]
fn invalid_policy_fails_the_run() {
    let h = Harness::baseline();
    let mut bad = policy("audit_log");
    bad.drop_after_months = 2;
    let config = KeeperConfig {
        partitions: vec![policy("events"), bad],
        ..Default::default()
    };

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert!(h.store.actions().is_empty());
}

#[test]
fn configured_entity_missing_from_catalog_is_per_object() {
    let h = Harness::baseline();
    let mut config = config();
    config.partitions.push(policy("sessions"));

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    let failures: Vec<_> = record.failures_of(FailureKind::PerObject).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].object, "public.sessions");
    assert_eq!(failures[0].phase, Phase::PartitionMaintenance);
}

#[test]
fn entity_locked_elsewhere_is_skipped_as_transient() {
    let h = Harness::baseline();
    let audit_log =
        TargetDescriptor::resolve("public", "audit_log", RelationKind::PartitionedTable).unwrap();
    h.store.hold_foreign_lock(&entity_lock_key(&audit_log));
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    let transient: Vec<_> = record
        .failures_of(FailureKind::Transient)
        .filter(|f| f.object == "public.audit_log")
        .map(|f| f.phase)
        .collect();
    assert_eq!(
        transient,
        vec![Phase::StatsUpdate, Phase::PartitionMaintenance, Phase::Vacuum]
    );
    assert!(h
        .store
        .actions()
        .iter()
        .all(|a| !a.target.starts_with("public.audit_log")));
}

#[test]
fn locks_are_released_and_run_is_persisted() {
    let h = Harness::baseline();
    let config = config();

    let record = h.orchestrator(&config).run(MaintenanceTier::Weekly).unwrap();

    assert!(h.store.held_locks().is_empty());
    let stored = h.state.get_run(&record.run_id).unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.phases_completed, record.phases_completed);
    assert_eq!(stored.phase_outcomes.len(), 7);
    assert!(h.state.running_runs().unwrap().is_empty());
}

#[test]
fn second_run_at_the_same_instant_changes_no_partitions() {
    let h = Harness::baseline();
    let config = config();
    h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();
    let partition_ops = |store: &SimulatedStore| {
        store
            .actions()
            .into_iter()
            .filter(|a| matches!(a.op, Op::CreatePartition | Op::DropPartition | Op::Archive))
            .count()
    };
    let before = partition_ops(&h.store);

    let record = h.orchestrator(&config).run(MaintenanceTier::Daily).unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(partition_ops(&h.store), before);
}

#[derive(Default)]
struct Recorder {
    phases: Mutex<Vec<Phase>>,
    finished: Mutex<Option<RunStatus>>,
}

impl MaintenanceEventHandler for Recorder {
    fn on_phase_completed(&self, event: &PhaseCompletedEvent) {
        self.phases.lock().unwrap().push(event.outcome.phase);
    }

    fn on_run_finished(&self, event: &RunFinishedEvent) {
        *self.finished.lock().unwrap() = Some(event.status);
    }
}

#[test]
fn events_follow_the_phase_order() {
    let h = Harness::baseline();
    let config = config();
    let recorder = Arc::new(Recorder::default());
    let mut events = EventDispatcher::new();
    events.register(recorder.clone());

    h.orchestrator(&config)
        .with_events(events)
        .run(MaintenanceTier::Weekly)
        .unwrap();

    assert_eq!(*recorder.phases.lock().unwrap(), Phase::ORDER.to_vec());
    assert_eq!(*recorder.finished.lock().unwrap(), Some(RunStatus::Completed));
}
