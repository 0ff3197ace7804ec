//! Materialized-view staleness policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_STALENESS_SECS;
use crate::models::RefreshMode;

/// Per-view override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedView {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    pub max_staleness_secs: Option<u64>,
    pub refresh_mode: Option<RefreshMode>,
}

fn default_schema() -> String {
    "public".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewConfig {
    /// Staleness allowed when a view has no override. Default: 6 hours.
    pub default_max_staleness_secs: Option<u64>,
    /// Also manage catalog views that have no entry in `tracked`. Default: true.
    pub track_all: Option<bool>,
    pub tracked: Vec<TrackedView>,
}

impl ViewConfig {
    pub fn effective_default_max_staleness(&self) -> Duration {
        Duration::from_secs(
            self.default_max_staleness_secs
                .unwrap_or(DEFAULT_MAX_STALENESS_SECS),
        )
    }

    pub fn effective_track_all(&self) -> bool {
        self.track_all.unwrap_or(true)
    }

    pub fn find(&self, schema: &str, name: &str) -> Option<&TrackedView> {
        self.tracked
            .iter()
            .find(|view| view.schema == schema && view.name == name)
    }

    /// Staleness bound and refresh mode for one view, or `None` when the view
    /// is not managed.
    pub fn policy_for(&self, schema: &str, name: &str) -> Option<(Duration, RefreshMode)> {
        match self.find(schema, name) {
            Some(view) => Some((
                view.max_staleness_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| self.effective_default_max_staleness()),
                view.refresh_mode.unwrap_or_default(),
            )),
            None if self.effective_track_all() => Some((
                self.effective_default_max_staleness(),
                RefreshMode::default(),
            )),
            None => None,
        }
    }
}
