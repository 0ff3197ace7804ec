//! Partition naming: `{entity}_p{YYYY}_{MM}` in the parent's schema.

use keeper_core::errors::CatalogError;
use keeper_core::models::{Ident, MonthPeriod, RelationKind, TargetDescriptor};

pub fn partition_name(entity: &str, period: &MonthPeriod) -> String {
    format!("{}_p{}", entity, period.suffix())
}

/// Descriptor of the partition of `parent` covering `period`. Fails when the
/// derived name is not a valid identifier (for example, too long).
pub fn partition_target(
    parent: &TargetDescriptor,
    period: &MonthPeriod,
) -> Result<TargetDescriptor, CatalogError> {
    let name = Ident::new(&partition_name(parent.name().as_str(), period))?;
    Ok(parent.sibling(name, RelationKind::Partition))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_carries_year_and_month() {
        let parent = TargetDescriptor::resolve("public", "events", RelationKind::PartitionedTable).unwrap();
        let period = MonthPeriod::new(2026, 3).unwrap();
        let target = partition_target(&parent, &period).unwrap();
        assert_eq!(target.qualified_name(), "public.events_p2026_03");
        assert_eq!(target.kind(), RelationKind::Partition);
    }

    #[test]
    fn overlong_entity_name_is_rejected() {
        let long = "e".repeat(60);
        let parent = TargetDescriptor::resolve("public", &long, RelationKind::PartitionedTable).unwrap();
        let period = MonthPeriod::new(2026, 3).unwrap();
        assert!(partition_target(&parent, &period).is_err());
    }
}
