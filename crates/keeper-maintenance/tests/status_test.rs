//! Read-only status views over the baseline catalog.

use chrono::{TimeZone, Utc};
use keeper_core::config::BloatConfig;
use keeper_core::models::PartitionStatus;
use keeper_maintenance::status::{index_health, partition_status};
use keeper_test_fixtures::load_catalog;

#[test]
fn partition_status_derives_lifecycle_from_now() {
    let store = load_catalog("catalog/baseline.json");
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

    let rows = partition_status(&store, now).unwrap();

    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].entity, "public.audit_log");
    let status_of = |name: &str| {
        rows.iter()
            .find(|r| r.partition == name)
            .map(|r| r.status)
            .unwrap()
    };
    assert_eq!(status_of("public.audit_log_p2026_10"), PartitionStatus::Current);
    assert_eq!(status_of("public.audit_log_p2026_11"), PartitionStatus::Future);
    assert_eq!(status_of("public.events_p2025_08"), PartitionStatus::Archived);
    assert_eq!(status_of("public.events_p2026_05"), PartitionStatus::Historical);
    assert!(store.actions().is_empty(), "status never mutates");
}

#[test]
fn index_health_lists_every_valid_index_most_bloated_first() {
    let store = load_catalog("catalog/baseline.json");

    let records = index_health(&store, &BloatConfig::default()).unwrap();

    assert_eq!(records.len(), 5);
    // Highest ratio, but below the minimum size: listed, never flagged.
    assert_eq!(records[0].index_name(), "public.audit_log_actor_idx");
    assert!(!records[0].flagged);
    assert_eq!(records.iter().filter(|r| r.flagged).count(), 3);
    assert!(records
        .windows(2)
        .all(|w| w[0].bloat_pct >= w[1].bloat_pct));
}
