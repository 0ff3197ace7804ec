//! Index statistics and per-index health records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifiers::TargetDescriptor;

/// Index access method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMethod {
    Btree,
    Gin,
    Gist,
    Brin,
    Hash,
    Other(String),
}

impl AccessMethod {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "btree" => Self::Btree,
            "gin" => Self::Gin,
            "gist" => Self::Gist,
            "brin" => Self::Brin,
            "hash" => Self::Hash,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Btree => "btree",
            Self::Gin => "gin",
            Self::Gist => "gist",
            Self::Brin => "brin",
            Self::Hash => "hash",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw statistics for one index, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub index: TargetDescriptor,
    pub table: TargetDescriptor,
    pub access_method: AccessMethod,
    pub size_bytes: u64,
    pub scan_count: u64,
    /// Estimated live rows of the indexed table (planner statistics).
    pub row_count: u64,
    /// Sum of the average widths of the indexed columns, in bytes.
    pub avg_key_width: u32,
    pub page_size: u64,
    /// Backs a primary key or unique constraint.
    pub constraint_backing: bool,
    /// False for leftovers of a failed concurrent build.
    pub valid: bool,
}

/// Bloat assessment of one index. Computed fresh per analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHealthRecord {
    pub index: TargetDescriptor,
    pub table: TargetDescriptor,
    pub access_method: AccessMethod,
    pub current_size_bytes: u64,
    pub estimated_ideal_size_bytes: u64,
    pub bloat_pct: f64,
    pub scan_count: u64,
    pub constraint_backing: bool,
    pub flagged: bool,
}

impl IndexHealthRecord {
    pub fn index_name(&self) -> String {
        self.index.qualified_name()
    }

    pub fn table_name(&self) -> String {
        self.table.qualified_name()
    }
}

/// `(current - ideal) / ideal * 100`, or 0 when the ideal size is 0.
pub fn bloat_pct(current_size_bytes: u64, estimated_ideal_size_bytes: u64) -> f64 {
    if estimated_ideal_size_bytes == 0 {
        return 0.0;
    }
    let current = current_size_bytes as f64;
    let ideal = estimated_ideal_size_bytes as f64;
    (current - ideal) / ideal * 100.0
}
