//! Audit entries for partition actions and view refreshes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::PeriodRange;
use super::view::RefreshMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionAction {
    Create,
    Archive,
    Drop,
}

impl PartitionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Archive => "archive",
            Self::Drop => "drop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "archive" => Some(Self::Archive),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// One partition lifecycle action. Drops are audited before they execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionAuditEntry {
    pub run_id: Option<Uuid>,
    /// Qualified name of the partitioned entity.
    pub entity: String,
    /// Qualified name of the partition.
    pub partition: String,
    pub action: PartitionAction,
    pub range: PeriodRange,
    pub size_bytes: u64,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// One successful materialized-view refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRefreshEntry {
    pub run_id: Option<Uuid>,
    /// Qualified view name.
    pub view: String,
    pub mode: RefreshMode,
    pub refreshed_at: DateTime<Utc>,
    pub duration_ms: u64,
}
