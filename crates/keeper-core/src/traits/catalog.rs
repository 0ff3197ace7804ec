//! Read-only access to the store's system catalog.

use crate::errors::CatalogError;
use crate::models::{
    IndexStats, LockChain, PartitionDescriptor, RelationKind, TargetDescriptor, ViewMetadata,
};

/// Catalog queries. Implementations return validated descriptors only; any
/// name that fails identifier validation is an error, never passed through.
pub trait CatalogReader: Send + Sync {
    /// Cheap connectivity check.
    fn ping(&self) -> Result<(), CatalogError>;

    /// Every partitioned (parent) table in the store.
    fn partitioned_entities(&self) -> Result<Vec<TargetDescriptor>, CatalogError>;

    /// Partitions attached to `entity`, in any order.
    fn list_partitions(
        &self,
        entity: &TargetDescriptor,
    ) -> Result<Vec<PartitionDescriptor>, CatalogError>;

    /// Statistics for every valid user index.
    fn index_stats(&self) -> Result<Vec<IndexStats>, CatalogError>;

    /// Indexes left invalid by a failed concurrent build.
    fn invalid_indexes(&self) -> Result<Vec<TargetDescriptor>, CatalogError>;

    fn materialized_views(&self) -> Result<Vec<ViewMetadata>, CatalogError>;

    /// Sessions currently blocked on a lock, with their blocker.
    fn blocking_lock_chains(&self) -> Result<Vec<LockChain>, CatalogError>;

    /// Resolve `schema.name` to a partitioned-table descriptor.
    fn resolve_entity(&self, schema: &str, name: &str) -> Result<TargetDescriptor, CatalogError> {
        self.partitioned_entities()?
            .into_iter()
            .find(|t| t.schema().as_str() == schema && t.name().as_str() == name)
            .ok_or_else(|| CatalogError::UnresolvedTarget {
                kind: RelationKind::PartitionedTable.as_str().to_string(),
                name: format!("{schema}.{name}"),
            })
    }
}
