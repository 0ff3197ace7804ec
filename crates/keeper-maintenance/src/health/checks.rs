//! Pure health checks over catalog and state snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keeper_core::models::{
    LockChain, MaintenanceRunRecord, MonthPeriod, PartitionDescriptor, Severity, TargetDescriptor,
};

use crate::partitions::naming::partition_name;

/// One problem found by a check. `suppressed` is set by the monitor when an
/// identical alert is still inside its cooldown window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFinding {
    pub severity: Severity,
    pub subject: String,
    pub message: String,
    pub detail: serde_json::Value,
    #[serde(default)]
    pub suppressed: bool,
}

impl HealthFinding {
    pub fn new(
        severity: Severity,
        subject: impl Into<String>,
        message: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
            detail,
            suppressed: false,
        }
    }
}

/// The current period and the next `lookahead` ones must each be covered.
/// A gap in the current or next period is critical; further out it is a
/// warning.
pub fn partition_coverage(
    entity: &TargetDescriptor,
    partitions: &[PartitionDescriptor],
    lookahead: u32,
    now: DateTime<Utc>,
) -> Vec<HealthFinding> {
    let current = MonthPeriod::containing(now);
    (0..=lookahead)
        .filter_map(|offset| {
            let period = current.offset(offset as i32);
            let range = period.range();
            if partitions.iter().any(|p| p.range.covers(&range)) {
                return None;
            }
            let severity = if offset <= 1 {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let expected = partition_name(entity.name().as_str(), &period);
            Some(HealthFinding::new(
                severity,
                format!("partition:{entity}"),
                format!("partition {expected} for {period} is missing"),
                serde_json::json!({
                    "entity": entity.qualified_name(),
                    "period": period.to_string(),
                    "offset": offset,
                }),
            ))
        })
        .collect()
}

pub fn oversized_partitions(
    partitions: &[PartitionDescriptor],
    max_size_bytes: u64,
) -> Vec<HealthFinding> {
    partitions
        .iter()
        .filter(|p| p.size_bytes > max_size_bytes)
        .map(|p| {
            HealthFinding::new(
                Severity::Warning,
                format!("partition:{}", p.target.qualified_name()),
                format!("partition size exceeds {max_size_bytes} bytes"),
                serde_json::json!({ "size_bytes": p.size_bytes, "limit_bytes": max_size_bytes }),
            )
        })
        .collect()
}

/// RUNNING records older than `max_duration`.
pub fn stuck_runs(
    running: &[MaintenanceRunRecord],
    max_duration: Duration,
    now: DateTime<Utc>,
) -> Vec<HealthFinding> {
    let Ok(limit) = chrono::Duration::from_std(max_duration) else {
        return Vec::new();
    };
    running
        .iter()
        .filter(|run| now - run.started_at > limit)
        .map(|run| {
            HealthFinding::new(
                Severity::Critical,
                format!("run:{}", run.run_id),
                "maintenance run stuck in RUNNING",
                serde_json::json!({
                    "maintenance_type": run.maintenance_type.as_str(),
                    "started_at": run.started_at.to_rfc3339(),
                }),
            )
        })
        .collect()
}

/// Blocked sessions waiting longer than `threshold_secs`, one finding per
/// relation.
pub fn lock_contention(chains: &[LockChain], threshold_secs: u64) -> Vec<HealthFinding> {
    let mut by_relation: BTreeMap<String, Vec<&LockChain>> = BTreeMap::new();
    for chain in chains.iter().filter(|c| c.wait_secs > threshold_secs as f64) {
        let relation = chain.relation.clone().unwrap_or_else(|| "unknown".to_string());
        by_relation.entry(relation).or_default().push(chain);
    }
    by_relation
        .into_iter()
        .map(|(relation, chains)| {
            let detail: Vec<serde_json::Value> = chains
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "blocked_pid": c.blocked_pid,
                        "blocking_pid": c.blocking_pid,
                        "wait_secs": c.wait_secs,
                    })
                })
                .collect();
            HealthFinding::new(
                Severity::Warning,
                format!("lock:{relation}"),
                format!("sessions blocked longer than {threshold_secs}s"),
                serde_json::json!({ "chains": detail }),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use keeper_core::models::{MaintenanceTier, RelationKind};

    fn partition(year: i32, month: u32, size_bytes: u64) -> PartitionDescriptor {
        let period = MonthPeriod::new(year, month).unwrap();
        PartitionDescriptor {
            target: TargetDescriptor::resolve(
                "public",
                &format!("events_p{}", period.suffix()),
                RelationKind::Partition,
            )
            .unwrap(),
            entity: "events".into(),
            range: period.range(),
            created_at: None,
            size_bytes,
            archived: false,
        }
    }

    #[test]
    fn gap_in_next_period_is_critical_and_further_out_is_warning() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let parts = vec![partition(2026, 10, 0), partition(2026, 12, 0)];
        let entity =
            TargetDescriptor::resolve("public", "events", RelationKind::PartitionedTable).unwrap();
        let findings = partition_coverage(&entity, &parts, 3, now);
        let by_message: Vec<(Severity, &str)> = findings
            .iter()
            .map(|f| (f.severity, f.message.as_str()))
            .collect();
        assert_eq!(
            by_message,
            vec![
                (Severity::Critical, "partition events_p2026_11 for 2026-11 is missing"),
                (Severity::Warning, "partition events_p2027_01 for 2027-01 is missing"),
            ]
        );
    }

    #[test]
    fn oversized_only_above_limit() {
        let parts = vec![partition(2026, 9, 100), partition(2026, 10, 101)];
        let findings = oversized_partitions(&parts, 100);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].subject, "partition:public.events_p2026_10");
    }

    #[test]
    fn stuck_run_detected_past_limit() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let old =
            MaintenanceRunRecord::begin(MaintenanceTier::Daily, now - chrono::Duration::hours(7));
        let fresh =
            MaintenanceRunRecord::begin(MaintenanceTier::Daily, now - chrono::Duration::hours(1));
        let findings = stuck_runs(&[old.clone(), fresh], Duration::from_secs(6 * 3600), now);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].subject, format!("run:{}", old.run_id));
    }

    #[test]
    fn lock_chains_grouped_by_relation() {
        let chain = |pid, relation: Option<&str>, wait| LockChain {
            blocked_pid: pid,
            blocking_pid: 1,
            relation: relation.map(str::to_string),
            wait_secs: wait,
            blocked_query: String::new(),
        };
        let chains = vec![
            chain(10, Some("public.events"), 45.0),
            chain(11, Some("public.events"), 60.0),
            chain(12, None, 5.0),
        ];
        let findings = lock_contention(&chains, 30);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].subject, "lock:public.events");
        assert_eq!(findings[0].detail["chains"].as_array().unwrap().len(), 2);
    }
}
