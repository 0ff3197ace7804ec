//! Index bloat thresholds and heuristic constants.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACTIVITY_FLOOR, DEFAULT_BLOAT_THRESHOLD_PCT, DEFAULT_BTREE_FILLFACTOR,
    DEFAULT_CONSERVATIVE_FRACTION, DEFAULT_GIN_PAGES_PER_ROW, DEFAULT_MIN_INDEX_SIZE_BYTES,
};

/// How a flagged index is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStrategy {
    /// Rebuild the existing index.
    #[default]
    InPlace,
    /// Build a replacement index and drop the old one.
    /// Never used for constraint-backing indexes.
    Recreate,
}

/// Configuration for the bloat analyzer and index executor.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BloatConfig {
    /// Bloat percentage above which an index is flagged. Default: 25.
    pub threshold_pct: Option<f64>,
    /// Minimum index size in bytes. Default: 100 MiB.
    pub min_size_bytes: Option<u64>,
    /// Minimum scan count. Default: 1000.
    pub activity_floor: Option<u64>,
    pub btree_fillfactor: Option<f64>,
    pub gin_pages_per_row: Option<f64>,
    pub conservative_fraction: Option<f64>,
    pub rebuild_strategy: Option<RebuildStrategy>,
    /// Allow the blocking fallback after a failed concurrent rebuild. Default: true.
    pub blocking_fallback: Option<bool>,
}

impl BloatConfig {
    pub fn effective_threshold_pct(&self) -> f64 {
        self.threshold_pct.unwrap_or(DEFAULT_BLOAT_THRESHOLD_PCT)
    }

    pub fn effective_min_size_bytes(&self) -> u64 {
        self.min_size_bytes.unwrap_or(DEFAULT_MIN_INDEX_SIZE_BYTES)
    }

    pub fn effective_activity_floor(&self) -> u64 {
        self.activity_floor.unwrap_or(DEFAULT_ACTIVITY_FLOOR)
    }

    pub fn effective_btree_fillfactor(&self) -> f64 {
        self.btree_fillfactor.unwrap_or(DEFAULT_BTREE_FILLFACTOR)
    }

    pub fn effective_gin_pages_per_row(&self) -> f64 {
        self.gin_pages_per_row.unwrap_or(DEFAULT_GIN_PAGES_PER_ROW)
    }

    pub fn effective_conservative_fraction(&self) -> f64 {
        self.conservative_fraction
            .unwrap_or(DEFAULT_CONSERVATIVE_FRACTION)
    }

    pub fn effective_rebuild_strategy(&self) -> RebuildStrategy {
        self.rebuild_strategy.unwrap_or_default()
    }

    pub fn effective_blocking_fallback(&self) -> bool {
        self.blocking_fallback.unwrap_or(true)
    }
}
