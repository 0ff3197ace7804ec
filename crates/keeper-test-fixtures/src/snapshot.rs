//! Serializable catalog snapshots used as JSON fixtures.

use serde::Deserialize;

use keeper_core::models::{IndexStats, LockChain, TargetDescriptor, ViewMetadata};

/// A whole catalog: partitioned entities, indexes, views, lock chains.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub entities: Vec<EntitySnapshot>,
    #[serde(default)]
    pub indexes: Vec<IndexStats>,
    #[serde(default)]
    pub invalid_indexes: Vec<TargetDescriptor>,
    #[serde(default)]
    pub views: Vec<ViewMetadata>,
    #[serde(default)]
    pub lock_chains: Vec<LockChain>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySnapshot {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub partitions: Vec<PartitionSnapshot>,
}

/// One monthly partition, named `{entity}_p{YYYY}_{MM}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionSnapshot {
    /// `YYYY-MM`.
    pub period: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub archived: bool,
}

fn default_schema() -> String {
    "public".to_string()
}
