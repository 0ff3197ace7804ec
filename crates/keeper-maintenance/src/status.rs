//! Read-only views for the status commands. Nothing here mutates the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use keeper_core::config::BloatConfig;
use keeper_core::errors::CatalogError;
use keeper_core::models::{IndexHealthRecord, PartitionStatus, PeriodRange};
use keeper_core::traits::CatalogReader;

use crate::bloat::IndexBloatAnalyzer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionStatusRow {
    pub entity: String,
    pub partition: String,
    pub range: PeriodRange,
    pub status: PartitionStatus,
    pub size_bytes: u64,
}

/// Every partition of every partitioned entity, ordered by entity then
/// range start. Status is derived from `now`.
pub fn partition_status(
    catalog: &dyn CatalogReader,
    now: DateTime<Utc>,
) -> Result<Vec<PartitionStatusRow>, CatalogError> {
    let mut rows = Vec::new();
    for entity in catalog.partitioned_entities()? {
        let mut partitions = catalog.list_partitions(&entity)?;
        partitions.sort_by_key(|p| p.range.start);
        rows.extend(partitions.into_iter().map(|p| PartitionStatusRow {
            entity: entity.qualified_name(),
            partition: p.target.qualified_name(),
            range: p.range,
            status: p.status(now),
            size_bytes: p.size_bytes,
        }));
    }
    rows.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.range.start.cmp(&b.range.start)));
    Ok(rows)
}

/// Current health of every valid index, most bloated first.
pub fn index_health(
    catalog: &dyn CatalogReader,
    bloat: &BloatConfig,
) -> Result<Vec<IndexHealthRecord>, CatalogError> {
    let stats = catalog.index_stats()?;
    Ok(IndexBloatAnalyzer::new(bloat).health_view(&stats))
}
