//! Maintenance run records: tiers, phases, outcomes and failure details.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which scheduled entry point started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceTier {
    Daily,
    Weekly,
}

impl MaintenanceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// Phases executed by this tier, in the fixed order of [`Phase::ORDER`].
    /// Index rebuilds are weekly only.
    pub fn phases(self) -> Vec<Phase> {
        Phase::ORDER
            .iter()
            .copied()
            .filter(|phase| match self {
                Self::Weekly => true,
                Self::Daily => *phase != Phase::IndexMaintenance,
            })
            .collect()
    }
}

impl fmt::Display for MaintenanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phases of a run. `Initiated` is the validation step before any work and
/// is never part of [`Phase::ORDER`]; `COMPLETED` and `FAILED` are tracked
/// through [`RunStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initiated,
    Cleanup,
    StatsUpdate,
    IndexMaintenance,
    ViewRefresh,
    PartitionMaintenance,
    Vacuum,
    HealthCheck,
}

impl Phase {
    pub const ORDER: [Phase; 7] = [
        Phase::Cleanup,
        Phase::StatsUpdate,
        Phase::IndexMaintenance,
        Phase::ViewRefresh,
        Phase::PartitionMaintenance,
        Phase::Vacuum,
        Phase::HealthCheck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Cleanup => "cleanup",
            Self::StatsUpdate => "stats_update",
            Self::IndexMaintenance => "index_maintenance",
            Self::ViewRefresh => "view_refresh",
            Self::PartitionMaintenance => "partition_maintenance",
            Self::Vacuum => "vacuum",
            Self::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Lock contention; retried on the next scheduled run.
    Transient,
    /// One object failed; the phase continues.
    PerObject,
    /// The run is aborted.
    Fatal,
    /// A guard refused an action on a protected object.
    SafetyViolation,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::PerObject => "per_object",
            Self::Fatal => "fatal",
            Self::SafetyViolation => "safety_violation",
        }
    }
}

/// One recorded failure or guarded rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub phase: Phase,
    /// Qualified name of the object, or the entity for entity-level failures.
    pub object: String,
    pub kind: FailureKind,
    pub message: String,
    /// Diagnostic context (sizes, bloat, attempts, error code).
    #[serde(default)]
    pub context: serde_json::Value,
}

impl FailureDetail {
    pub fn new(
        phase: Phase,
        object: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            object: object.into(),
            kind,
            message: message.into(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Add the keys of `extra` to the existing context object. Existing keys
    /// are kept unless `extra` sets them too; a non-object context is
    /// replaced.
    pub fn merge_context(mut self, extra: serde_json::Value) -> Self {
        match (&mut self.context, extra) {
            (serde_json::Value::Object(current), serde_json::Value::Object(extra)) => {
                current.extend(extra);
            }
            (_, extra) => self.context = extra,
        }
        self
    }
}

/// Per-phase counters kept in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PhaseOutcome {
    pub fn new(phase: Phase, started_at: DateTime<Utc>) -> Self {
        Self {
            phase,
            started_at,
            duration_ms: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            note: None,
        }
    }
}

/// One maintenance run. Created RUNNING before the first phase and finalized
/// exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRunRecord {
    pub run_id: Uuid,
    pub maintenance_type: MaintenanceTier,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub phases_completed: Vec<Phase>,
    pub failure_details: Vec<FailureDetail>,
    pub phase_outcomes: Vec<PhaseOutcome>,
    pub duration_ms: Option<u64>,
}

impl MaintenanceRunRecord {
    pub fn begin(tier: MaintenanceTier, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            maintenance_type: tier,
            started_at,
            completed_at: None,
            status: RunStatus::Running,
            phases_completed: Vec::new(),
            failure_details: Vec::new(),
            phase_outcomes: Vec::new(),
            duration_ms: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::Running
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FailureDetail> {
        self.failure_details.iter().filter(move |f| f.kind == kind)
    }

    /// Set the terminal status, completion time and duration.
    pub fn finish(&mut self, status: RunStatus, completed_at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(completed_at);
        let elapsed = (completed_at - self.started_at).num_milliseconds().max(0);
        self.duration_ms = Some(elapsed as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_tier_skips_index_maintenance() {
        let phases = MaintenanceTier::Daily.phases();
        assert!(!phases.contains(&Phase::IndexMaintenance));
        assert_eq!(phases.first(), Some(&Phase::Cleanup));
        assert_eq!(phases.last(), Some(&Phase::HealthCheck));
        assert_eq!(MaintenanceTier::Weekly.phases(), Phase::ORDER.to_vec());
    }

    #[test]
    fn finish_records_duration() {
        let start = Utc::now();
        let mut record = MaintenanceRunRecord::begin(MaintenanceTier::Daily, start);
        record.finish(RunStatus::Completed, start + chrono::Duration::milliseconds(1500));
        assert_eq!(record.duration_ms, Some(1500));
        assert!(record.is_finished());
    }
}
