//! Partition lifecycle against the simulated store.

use chrono::{DateTime, Months, TimeZone, Utc};
use keeper_core::config::TimeoutConfig;
use keeper_core::errors::ActionError;
use keeper_core::models::{
    FailureKind, MonthPeriod, PartitionAction, PeriodRange, RetentionPolicy, TargetDescriptor,
};
use keeper_core::traits::StateStore;
use keeper_maintenance::{Collaborators, PartitionLifecycleManager, PhaseReport};
use keeper_storage::SqliteStateStore;
use keeper_test_fixtures::{FaultyStateStore, Op, SimulatedStore, TestClock};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn policy(future: u32, archive: u32, drop: u32) -> RetentionPolicy {
    RetentionPolicy {
        entity_type: "events".into(),
        schema: "public".into(),
        future_periods: future,
        archive_after_months: archive,
        drop_after_months: drop,
    }
}

struct Harness {
    store: SimulatedStore,
    state: FaultyStateStore<SqliteStateStore>,
    clock: TestClock,
    events: TargetDescriptor,
}

impl Harness {
    fn new(now: DateTime<Utc>) -> Self {
        let store = SimulatedStore::new();
        let events = store.add_entity("public", "events");
        Self {
            store,
            state: FaultyStateStore::new(SqliteStateStore::open_in_memory().unwrap()),
            clock: TestClock::at(now),
            events,
        }
    }

    fn manager(&self) -> PartitionLifecycleManager<'_> {
        let deps = Collaborators::from_store(&self.store, &self.state, &self.clock);
        PartitionLifecycleManager::new(deps, TimeoutConfig::default())
    }

    fn names(&self) -> Vec<String> {
        self.store.partition_names("public.events")
    }
}

#[test]
fn creates_future_partitions_across_year_boundary() {
    let now = at(2026, 11, 15);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2026, 11, 0);

    let report = h.manager().create_future_partitions(&h.events, 3, now).unwrap();

    assert_eq!(report.succeeded, 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        h.names(),
        vec!["events_p2026_11", "events_p2026_12", "events_p2027_01", "events_p2027_02"]
    );
    let created = h.store.actions_of(Op::CreatePartition);
    assert_eq!(created.len(), 3);
    assert_eq!(created[1].target, "public.events_p2027_01");
}

#[test]
fn created_ranges_have_exact_month_boundaries() {
    let now = at(2026, 11, 15);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2026, 11, 0);
    h.manager().create_future_partitions(&h.events, 3, now).unwrap();

    let audit = h.state.partition_audit("public.events", 10).unwrap();
    let mut ranges: Vec<PeriodRange> = audit
        .iter()
        .filter(|e| e.action == PartitionAction::Create)
        .map(|e| e.range)
        .collect();
    ranges.sort();
    let expected: Vec<PeriodRange> = [(2026, 12), (2027, 1), (2027, 2)]
        .iter()
        .map(|&(y, m)| MonthPeriod::new(y, m).unwrap().range())
        .collect();
    assert_eq!(ranges, expected);
    assert_eq!(ranges[0].end, ranges[1].start);
}

#[test]
fn second_invocation_creates_nothing() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    let manager = h.manager();

    let first = manager.create_future_partitions(&h.events, 3, now).unwrap();
    let second = manager.create_future_partitions(&h.events, 3, now).unwrap();

    assert_eq!(first.succeeded, 3);
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(h.store.actions_of(Op::CreatePartition).len(), 3);
}

#[test]
fn existing_wider_partition_counts_as_covering() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    let two_months = PeriodRange::new(
        MonthPeriod::new(2026, 11).unwrap().start(),
        MonthPeriod::new(2027, 1).unwrap().start(),
    );
    h.store.add_partition(&h.events, "events_2026_nov_dec", two_months, 0, false);

    let report = h.manager().create_future_partitions(&h.events, 3, now).unwrap();

    assert_eq!(report.succeeded, 1, "only 2027-01 is outside the wide partition");
    assert_eq!(report.skipped, 2);
}

#[test]
fn partial_overlap_is_a_per_object_failure() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    let odd = PeriodRange::new(
        chrono::NaiveDate::from_ymd_opt(2026, 11, 15).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2026, 12, 15).unwrap(),
    );
    h.store.add_partition(&h.events, "events_odd", odd, 0, false);

    let report = h.manager().create_future_partitions(&h.events, 3, now).unwrap();

    assert_eq!(report.failed, 2, "2026-11 and 2026-12 both clash");
    assert_eq!(report.succeeded, 1);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::PerObject && f.message.contains("events_odd")));
}

#[test]
fn ensure_current_creates_missing_current_partition() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);

    let report = h.manager().ensure_current_partition(&h.events, now).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(h.names(), vec!["events_p2026_10"]);
}

#[test]
fn archives_partitions_past_the_archive_window() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    for month in 5..=10 {
        h.store.add_month(&h.events, 2026, month, 1024);
    }

    let report = h
        .manager()
        .archive_partitions(&h.events, Months::new(3), now)
        .unwrap();

    // cutoff 2026-07-19: May and June have ended, July has not.
    let archived: Vec<String> = h
        .store
        .actions_of(Op::Archive)
        .into_iter()
        .map(|a| a.target)
        .collect();
    assert_eq!(archived, vec!["public.events_p2026_05", "public.events_p2026_06"]);
    assert_eq!(report.succeeded, 2);

    let again = h
        .manager()
        .archive_partitions(&h.events, Months::new(3), now)
        .unwrap();
    assert_eq!(again.succeeded, 0, "already archived partitions are left alone");
}

#[test]
fn drop_writes_audit_entry_first() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2025, 8, 4096);
    h.store.add_month(&h.events, 2026, 10, 0);

    let report = h
        .manager()
        .drop_partitions(&h.events, Months::new(12), now)
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(h.names(), vec!["events_p2026_10"]);
    let audit = h.state.partition_audit("public.events", 10).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, PartitionAction::Drop);
    assert_eq!(audit[0].partition, "public.events_p2025_08");
    assert_eq!(audit[0].size_bytes, 4096);
}

#[test]
fn failed_audit_write_skips_the_drop() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2025, 8, 4096);
    h.state.fail_partition_audit(true);

    let report = h
        .manager()
        .drop_partitions(&h.events, Months::new(12), now)
        .unwrap();

    assert_eq!(report.failed, 1);
    assert!(report.failures[0].message.contains("audit write failed"));
    assert!(h.store.actions_of(Op::DropPartition).is_empty());
    assert_eq!(h.names(), vec!["events_p2025_08"]);
}

#[test]
fn guard_rejects_current_partition() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2026, 10, 0);
    let current = keeper_core::traits::CatalogReader::list_partitions(&h.store, &h.events)
        .unwrap()
        .remove(0);

    let mut report = PhaseReport::new();
    h.manager()
        .drop_one(&h.events, &current, now, &mut report)
        .unwrap();
    h.manager()
        .archive_one(&h.events, &current, now, &mut report)
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::SafetyViolation));
    assert!(h.store.actions_of(Op::DropPartition).is_empty());
    assert!(h.store.actions_of(Op::Archive).is_empty());
    assert!(h.state.partition_audit("public.events", 10).unwrap().is_empty());
}

#[test]
fn lock_timeout_on_create_is_transient() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2026, 10, 0);
    h.store.fail_action(
        Op::CreatePartition,
        "public.events_p2026_11",
        ActionError::LockTimeout {
            target: "public.events".into(),
            waited_ms: 5000,
        },
    );

    let report = h.manager().create_future_partitions(&h.events, 2, now).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Transient);
}

#[test]
fn connection_loss_is_fatal() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.fail_action(
        Op::CreatePartition,
        "public.events_p2026_10",
        ActionError::ConnectionLost {
            message: "terminated".into(),
        },
    );

    assert!(h.manager().ensure_current_partition(&h.events, now).is_err());
}

#[test]
fn apply_policy_rejects_invalid_ordering() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);

    let result = h.manager().apply_policy(&h.events, &policy(3, 12, 6), now);

    assert!(result.is_err());
    assert!(h.store.actions().is_empty());
}

#[test]
fn apply_policy_runs_the_whole_lifecycle() {
    let now = at(2026, 10, 19);
    let h = Harness::new(now);
    h.store.add_month(&h.events, 2025, 8, 10);
    h.store.add_month(&h.events, 2026, 6, 10);
    h.store.add_month(&h.events, 2026, 9, 10);

    let report = h.manager().apply_policy(&h.events, &policy(2, 3, 12), now).unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(
        h.names(),
        vec![
            "events_p2026_06",
            "events_p2026_09",
            "events_p2026_10",
            "events_p2026_11",
            "events_p2026_12",
        ]
    );
    assert_eq!(h.store.actions_of(Op::DropPartition).len(), 1);
    assert_eq!(h.store.actions_of(Op::Archive).len(), 1);
}
