//! Tests for the data model: descriptors, partition status, staleness, policies.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use keeper_core::errors::{CatalogError, PolicyError};
use keeper_core::models::*;

fn partition(name: &str, year: i32, month: u32) -> PartitionDescriptor {
    PartitionDescriptor {
        target: TargetDescriptor::resolve("public", name, RelationKind::Partition).unwrap(),
        entity: "events".to_string(),
        range: MonthPeriod::new(year, month).unwrap().range(),
        created_at: None,
        size_bytes: 0,
        archived: false,
    }
}

#[test]
fn identifiers_reject_injection_attempts() {
    let too_long = "x".repeat(64);
    for bad in ["", "1abc", "events; DROP TABLE x", "a\"b", "tab le", too_long.as_str()] {
        assert!(
            matches!(Ident::new(bad), Err(CatalogError::InvalidIdentifier { .. })),
            "{bad:?} should be rejected"
        );
    }
    assert!(Ident::new("events_p2026_10").is_ok());
    assert!(Ident::new("_tmp$1").is_ok());
}

#[test]
fn descriptor_quotes_both_parts() {
    let t = TargetDescriptor::resolve("public", "events", RelationKind::PartitionedTable).unwrap();
    assert_eq!(t.quoted(), "\"public\".\"events\"");
    assert_eq!(t.qualified_name(), "public.events");
}

#[test]
fn descriptor_deserialization_validates() {
    let json = r#"{"schema":"public","name":"bad name","kind":"table"}"#;
    assert!(serde_json::from_str::<TargetDescriptor>(json).is_err());
}

#[test]
fn partition_status_is_derived_from_now() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    assert_eq!(partition("events_p2026_10", 2026, 10).status(now), PartitionStatus::Current);
    assert_eq!(partition("events_p2026_11", 2026, 11).status(now), PartitionStatus::Future);
    assert_eq!(partition("events_p2026_01", 2026, 1).status(now), PartitionStatus::Historical);

    let mut archived_current = partition("events_p2026_10", 2026, 10);
    archived_current.archived = true;
    assert_eq!(archived_current.status(now), PartitionStatus::Current);

    let mut archived_old = partition("events_p2025_01", 2025, 1);
    archived_old.archived = true;
    assert_eq!(archived_old.status(now), PartitionStatus::Archived);
}

#[test]
fn zero_ideal_size_means_zero_bloat() {
    assert_eq!(bloat_pct(500 * 1024 * 1024, 0), 0.0);
    assert_eq!(bloat_pct(0, 0), 0.0);
    assert_eq!(bloat_pct(150, 100), 50.0);
}

#[test]
fn unknown_refresh_is_maximally_stale() {
    let now = Utc::now();
    let view = MaterializedViewDescriptor {
        target: TargetDescriptor::resolve("public", "mv", RelationKind::MaterializedView).unwrap(),
        last_refreshed_at: None,
        max_staleness: Duration::from_secs(6 * 3600),
        refresh_mode: RefreshMode::Concurrent,
        has_unique_index: true,
        populated: true,
    };
    assert!(view.is_stale(now));

    let fresh = MaterializedViewDescriptor {
        last_refreshed_at: Some(now - chrono::Duration::hours(1)),
        ..view.clone()
    };
    assert!(!fresh.is_stale(now));

    let old = MaterializedViewDescriptor {
        last_refreshed_at: Some(now - chrono::Duration::hours(7)),
        ..view
    };
    assert!(old.is_stale(now));
}

#[test]
fn policy_validation_enforces_ordering() {
    let policy = RetentionPolicy {
        entity_type: "events".into(),
        schema: "public".into(),
        future_periods: 3,
        archive_after_months: 6,
        drop_after_months: 24,
    };
    assert!(policy.validate().is_ok());

    let equal = RetentionPolicy {
        drop_after_months: 6,
        ..policy.clone()
    };
    assert!(matches!(equal.validate(), Err(PolicyError::InvalidOrdering { .. })));

    let zero = RetentionPolicy {
        archive_after_months: 0,
        ..policy.clone()
    };
    assert!(zero.validate().is_err());

    let no_future = RetentionPolicy {
        future_periods: 0,
        ..policy
    };
    assert!(matches!(no_future.validate(), Err(PolicyError::NoFuturePeriods { .. })));
}

#[test]
fn run_record_serializes_phases_in_snake_case() {
    let record = MaintenanceRunRecord::begin(MaintenanceTier::Weekly, Utc::now());
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["status"], "running");
    assert_eq!(json["maintenance_type"], "weekly");
    assert_eq!(
        serde_json::to_value(Phase::PartitionMaintenance).unwrap(),
        "partition_maintenance"
    );
}

#[test]
fn merged_failure_context_keeps_error_code() {
    let detail = FailureDetail::new(
        Phase::IndexMaintenance,
        "public.events_tenant_idx",
        FailureKind::PerObject,
        "rebuild failed",
    )
    .with_context(serde_json::json!({ "error_code": "ACTION_FAILED" }))
    .merge_context(serde_json::json!({ "bloat_pct": 41.5, "attempts": [] }));

    assert_eq!(detail.context["error_code"], "ACTION_FAILED");
    assert_eq!(detail.context["bloat_pct"], 41.5);
    assert!(detail.context["attempts"].is_array());

    let bare = FailureDetail::new(Phase::Vacuum, "x", FailureKind::PerObject, "m")
        .merge_context(serde_json::json!({ "view": "public.v" }));
    assert_eq!(bare.context["view"], "public.v");
}
