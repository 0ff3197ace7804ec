//! Property tests for the partition lifecycle invariants.

use chrono::{TimeZone, Utc};
use keeper_core::config::TimeoutConfig;
use keeper_core::models::{MonthPeriod, RetentionPolicy};
use keeper_maintenance::{Collaborators, PartitionLifecycleManager};
use keeper_storage::SqliteStateStore;
use keeper_test_fixtures::{Op, SimulatedStore, TestClock};
use proptest::prelude::*;

fn scenario() -> impl Strategy<Value = (i32, u32, u32, u32, u32, u32, u32)> {
    (
        2020i32..2035,
        1u32..=12,
        1u32..=28,
        0u32..24,
        1u32..=6,
        1u32..=18,
        1u32..=18,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn current_partition_is_never_archived_or_dropped(
        (year, month, day, hour, future, archive, extra) in scenario()
    ) {
        let now = Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap();
        let store = SimulatedStore::new();
        let events = store.add_entity("public", "events");
        let current = MonthPeriod::containing(now);
        for offset in -40..=0 {
            let period = current.offset(offset);
            store.add_month(&events, period.year(), period.month(), 1);
        }
        let state = SqliteStateStore::open_in_memory().unwrap();
        let clock = TestClock::at(now);
        let deps = Collaborators::from_store(&store, &state, &clock);
        let policy = RetentionPolicy {
            entity_type: "events".into(),
            schema: "public".into(),
            future_periods: future,
            archive_after_months: archive,
            drop_after_months: archive + extra,
        };

        PartitionLifecycleManager::new(deps, TimeoutConfig::default())
            .apply_policy(&events, &policy, now)
            .unwrap();

        let current_name = format!("public.events_p{}", current.suffix());
        let touched = store
            .actions()
            .into_iter()
            .filter(|a| matches!(a.op, Op::DropPartition | Op::Archive) && a.succeeded)
            .any(|a| a.target == current_name);
        prop_assert!(!touched);
        let expected_current = format!("events_p{}", current.suffix());
        prop_assert!(store
            .partition_names("public.events")
            .contains(&expected_current));
    }

    #[test]
    fn applying_a_policy_twice_mutates_once(
        (year, month, day, hour, future, archive, extra) in scenario()
    ) {
        let now = Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap();
        let store = SimulatedStore::new();
        let events = store.add_entity("public", "events");
        let current = MonthPeriod::containing(now);
        for offset in [-30, -12, -4, -1] {
            let period = current.offset(offset);
            store.add_month(&events, period.year(), period.month(), 1);
        }
        let state = SqliteStateStore::open_in_memory().unwrap();
        let clock = TestClock::at(now);
        let deps = Collaborators::from_store(&store, &state, &clock);
        let manager = PartitionLifecycleManager::new(deps, TimeoutConfig::default());
        let policy = RetentionPolicy {
            entity_type: "events".into(),
            schema: "public".into(),
            future_periods: future,
            archive_after_months: archive,
            drop_after_months: archive + extra,
        };

        manager.apply_policy(&events, &policy, now).unwrap();
        let after_first = store.actions().len();
        let second = manager.apply_policy(&events, &policy, now).unwrap();

        prop_assert_eq!(store.actions().len(), after_first);
        prop_assert_eq!(second.succeeded, 0);
        prop_assert!(second.failures.is_empty());
        let names = store.partition_names("public.events");
        for offset in 0..=future as i32 {
            let expected = format!("events_p{}", current.offset(offset).suffix());
            prop_assert!(names.contains(&expected), "missing {}", expected);
        }
    }
}
