//! Partition descriptors: a derived view over the store's catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::TargetDescriptor;
use super::period::PeriodRange;

/// Lifecycle status, derived from the period and `now`; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStatus {
    Current,
    Future,
    Historical,
    Archived,
}

impl PartitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Future => "future",
            Self::Historical => "historical",
            Self::Archived => "archived",
        }
    }
}

/// One partition of a partitioned entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub target: TargetDescriptor,
    /// Parent (partitioned) table name.
    pub entity: String,
    pub range: PeriodRange,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    /// Set by the catalog when the partition lives on the archive tier.
    pub archived: bool,
}

impl PartitionDescriptor {
    pub fn table_name(&self) -> &str {
        self.target.name().as_str()
    }

    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.range.contains(instant)
    }

    /// The partition covering `now` reports `Current` even when archived,
    /// so it can never look like an archive/drop leftover.
    pub fn status(&self, now: DateTime<Utc>) -> PartitionStatus {
        if self.covers(now) {
            PartitionStatus::Current
        } else if self.range.start_utc() > now {
            PartitionStatus::Future
        } else if self.archived {
            PartitionStatus::Archived
        } else {
            PartitionStatus::Historical
        }
    }
}
