//! Materialized view refresh against the simulated store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use keeper_core::config::{TimeoutConfig, TrackedView, ViewConfig};
use keeper_core::errors::ActionError;
use keeper_core::models::{
    FailureKind, RefreshMode, RelationKind, TargetDescriptor, ViewMetadata, ViewRefreshEntry,
};
use keeper_core::traits::{ActionMode, StateStore};
use keeper_maintenance::views::RefreshOutcome;
use keeper_maintenance::{Collaborators, MaterializedViewRefresher, PhaseReport};
use keeper_storage::SqliteStateStore;
use keeper_test_fixtures::{FaultyStateStore, Op, SimulatedStore, TestClock};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

fn view(name: &str, has_unique_index: bool) -> ViewMetadata {
    ViewMetadata {
        target: TargetDescriptor::resolve("public", name, RelationKind::MaterializedView).unwrap(),
        has_unique_index,
        populated: true,
    }
}

struct Harness {
    store: SimulatedStore,
    state: FaultyStateStore<SqliteStateStore>,
    clock: TestClock,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: SimulatedStore::new(),
            state: FaultyStateStore::new(SqliteStateStore::open_in_memory().unwrap()),
            clock: TestClock::at(now()),
        }
    }

    fn refresher(&self, views: ViewConfig) -> MaterializedViewRefresher<'_> {
        let deps = Collaborators::from_store(&self.store, &self.state, &self.clock);
        MaterializedViewRefresher::new(deps, views, TimeoutConfig::default())
    }

    fn refreshed_at(&self, name: &str, at: DateTime<Utc>) {
        self.state
            .record_view_refresh(&ViewRefreshEntry {
                run_id: None,
                view: format!("public.{name}"),
                mode: RefreshMode::Concurrent,
                refreshed_at: at,
                duration_ms: 10,
            })
            .unwrap();
    }
}

#[test]
fn stale_view_without_unique_index_falls_back_to_blocking() {
    let h = Harness::new();
    h.store.add_view(view("tenant_summary", false));
    h.refreshed_at("tenant_summary", now() - Duration::hours(7));

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(report.failures.is_empty());
    assert!(h.store.actions_of(Op::RefreshView(ActionMode::Concurrent)).is_empty());
    assert_eq!(h.store.actions_of(Op::RefreshView(ActionMode::Blocking)).len(), 1);
    assert_eq!(
        h.state.last_view_refresh("public.tenant_summary").unwrap(),
        Some(now())
    );
}

#[test]
fn fresh_view_is_skipped() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    h.refreshed_at("daily_rollup", now() - Duration::hours(2));

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.skipped, 1);
    assert!(h.store.actions().is_empty());
}

#[test]
fn never_refreshed_view_is_stale() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    let refresher = h.refresher(ViewConfig::default());
    let tracked = refresher.tracked_views().unwrap();
    let mut report = PhaseReport::new();

    let outcome = refresher.refresh_if_stale(&tracked[0], now(), &mut report).unwrap();

    assert!(matches!(
        outcome,
        RefreshOutcome::Refreshed {
            mode: ActionMode::Concurrent,
            ..
        }
    ));
}

#[test]
fn staleness_exactly_at_the_bound_is_fresh() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    h.refreshed_at("daily_rollup", now() - Duration::hours(6));

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.skipped, 1);
}

#[test]
fn configured_blocking_mode_skips_the_concurrent_attempt() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    let config = ViewConfig {
        tracked: vec![TrackedView {
            schema: "public".into(),
            name: "daily_rollup".into(),
            max_staleness_secs: Some(60),
            refresh_mode: Some(RefreshMode::Blocking),
        }],
        ..Default::default()
    };

    h.refresher(config).refresh_all(now()).unwrap();

    let actions = h.store.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].op, Op::RefreshView(ActionMode::Blocking));
}

#[test]
fn untracked_views_are_ignored_when_track_all_is_off() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    h.store.add_view(view("tenant_summary", false));
    let config = ViewConfig {
        track_all: Some(false),
        tracked: vec![TrackedView {
            schema: "public".into(),
            name: "daily_rollup".into(),
            max_staleness_secs: None,
            refresh_mode: None,
        }],
        ..Default::default()
    };

    let tracked = h.refresher(config).tracked_views().unwrap();

    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].target.qualified_name(), "public.daily_rollup");
}

#[test]
fn failure_of_both_paths_keeps_previous_refresh_time() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    let earlier = now() - Duration::hours(9);
    h.refreshed_at("daily_rollup", earlier);
    for mode in [ActionMode::Concurrent, ActionMode::Blocking] {
        h.store.fail_action(
            Op::RefreshView(mode),
            "public.daily_rollup",
            ActionError::Failed {
                target: "public.daily_rollup".into(),
                message: "division by zero".into(),
            },
        );
    }

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::PerObject);
    assert_eq!(report.failures[0].context["error_code"], "ACTION_FAILED");
    assert_eq!(report.failures[0].context["view"], "public.daily_rollup");
    assert_eq!(
        report.failures[0].context["attempts"].as_array().unwrap().len(),
        2
    );
    assert_eq!(
        h.state.last_view_refresh("public.daily_rollup").unwrap(),
        Some(earlier)
    );
}

#[test]
fn lock_timeout_defers_the_view() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    h.store.fail_action(
        Op::RefreshView(ActionMode::Concurrent),
        "public.daily_rollup",
        ActionError::LockTimeout {
            target: "public.daily_rollup".into(),
            waited_ms: 5000,
        },
    );

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Transient);
    assert!(h.store.actions_of(Op::RefreshView(ActionMode::Blocking)).is_empty());
}

#[test]
fn unpersisted_refresh_time_is_noted() {
    let h = Harness::new();
    h.store.add_view(view("daily_rollup", true));
    h.state.fail_view_refresh_log(true);

    let report = h.refresher(ViewConfig::default()).refresh_all(now()).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert!(report.failures[0].message.contains("not persisted"));
}
