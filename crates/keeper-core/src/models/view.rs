//! Materialized-view descriptors and staleness.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::TargetDescriptor;

/// Preferred refresh path for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Non-blocking refresh with blocking fallback.
    #[default]
    Concurrent,
    /// Always refresh with the exclusive lock.
    Blocking,
}

impl RefreshMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "concurrent",
            Self::Blocking => "blocking",
        }
    }
}

/// Catalog facts about a materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMetadata {
    pub target: TargetDescriptor,
    pub has_unique_index: bool,
    pub populated: bool,
}

/// A tracked view: catalog facts joined with its staleness policy and the
/// last refresh time from the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedViewDescriptor {
    pub target: TargetDescriptor,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub max_staleness: Duration,
    pub refresh_mode: RefreshMode,
    pub has_unique_index: bool,
    pub populated: bool,
}

impl MaterializedViewDescriptor {
    /// Elapsed time since the last refresh; `None` when never refreshed
    /// (treated as maximally stale).
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_refreshed_at.map(|at| now - at)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.staleness(now) {
            None => true,
            Some(elapsed) => match chrono::Duration::from_std(self.max_staleness) {
                Ok(limit) => elapsed > limit,
                // A limit beyond chrono's range can never be exceeded.
                Err(_) => false,
            },
        }
    }

    /// Non-blocking refresh is possible only with a unique index on a populated view.
    pub fn supports_concurrent_refresh(&self) -> bool {
        self.has_unique_index && self.populated
    }
}
