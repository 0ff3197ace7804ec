//! DDL rendering. Every identifier comes from a validated descriptor and is
//! rendered quoted; literals are dates formatted here, never caller strings.

use keeper_core::errors::CatalogError;
use keeper_core::models::{Ident, PeriodRange, RelationKind, TargetDescriptor};
use keeper_core::traits::ActionMode;

pub fn create_partition(
    parent: &TargetDescriptor,
    partition: &TargetDescriptor,
    range: &PeriodRange,
) -> String {
    format!(
        "CREATE TABLE {} PARTITION OF {} FOR VALUES FROM ('{}') TO ('{}')",
        partition.quoted(),
        parent.quoted(),
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d"),
    )
}

pub fn detach_partition(parent: &TargetDescriptor, partition: &TargetDescriptor) -> String {
    format!(
        "ALTER TABLE {} DETACH PARTITION {}",
        parent.quoted(),
        partition.quoted()
    )
}

pub fn drop_table(table: &TargetDescriptor) -> String {
    format!("DROP TABLE {}", table.quoted())
}

pub fn reindex(index: &TargetDescriptor, mode: ActionMode) -> String {
    match mode {
        ActionMode::Concurrent => format!("REINDEX INDEX CONCURRENTLY {}", index.quoted()),
        ActionMode::Blocking => format!("REINDEX INDEX {}", index.quoted()),
    }
}

pub fn drop_index(index: &TargetDescriptor) -> String {
    format!("DROP INDEX CONCURRENTLY IF EXISTS {}", index.quoted())
}

pub fn rename_index(index: &TargetDescriptor, to: &Ident) -> String {
    format!("ALTER INDEX {} RENAME TO {}", index.quoted(), to.quoted())
}

pub fn refresh_view(view: &TargetDescriptor, mode: ActionMode) -> String {
    match mode {
        ActionMode::Concurrent => {
            format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", view.quoted())
        }
        ActionMode::Blocking => format!("REFRESH MATERIALIZED VIEW {}", view.quoted()),
    }
}

pub fn analyze(table: &TargetDescriptor) -> String {
    format!("ANALYZE {}", table.quoted())
}

pub fn vacuum(table: &TargetDescriptor) -> String {
    format!("VACUUM {}", table.quoted())
}

pub fn set_tablespace(table: &TargetDescriptor, tablespace: &Ident) -> String {
    format!(
        "ALTER TABLE {} SET TABLESPACE {}",
        table.quoted(),
        tablespace.quoted()
    )
}

/// Name of the replacement built by a recreate: `{name}_kr`, shortened so
/// it stays a valid identifier.
pub fn replacement_index(index: &TargetDescriptor) -> Result<TargetDescriptor, CatalogError> {
    const SUFFIX: &str = "_kr";
    let base = index.name().as_str();
    let keep = base.len().min(keeper_core::models::identifiers::MAX_IDENT_LEN - SUFFIX.len());
    let name = Ident::new(&format!("{}{}", &base[..keep], SUFFIX))?;
    Ok(index.sibling(name, RelationKind::Index))
}

/// Turn `pg_get_indexdef` output into a concurrent build of `replacement`.
///
/// Only plain `CREATE [UNIQUE] INDEX name ON ...` definitions are accepted.
pub fn replacement_definition(definition: &str, replacement: &TargetDescriptor) -> Option<String> {
    let (unique, rest) = if let Some(rest) = definition.strip_prefix("CREATE UNIQUE INDEX ") {
        (true, rest)
    } else {
        (false, definition.strip_prefix("CREATE INDEX ")?)
    };
    let (_, tail) = rest.split_once(" ON ")?;
    Some(format!(
        "CREATE {}INDEX CONCURRENTLY {} ON {}",
        if unique { "UNIQUE " } else { "" },
        replacement.name().quoted(),
        tail
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn target(name: &str, kind: RelationKind) -> TargetDescriptor {
        TargetDescriptor::resolve("public", name, kind).unwrap()
    }

    #[test]
    fn renders_create_partition_with_quoted_names() {
        let parent = target("events", RelationKind::PartitionedTable);
        let partition = target("events_p2026_11", RelationKind::Partition);
        let range = PeriodRange::new(
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        );

        assert_eq!(
            create_partition(&parent, &partition, &range),
            "CREATE TABLE \"public\".\"events_p2026_11\" PARTITION OF \"public\".\"events\" \
             FOR VALUES FROM ('2026-11-01') TO ('2026-12-01')"
        );
    }

    #[test]
    fn renders_both_rebuild_modes() {
        let index = target("events_idx", RelationKind::Index);
        assert_eq!(
            reindex(&index, ActionMode::Concurrent),
            "REINDEX INDEX CONCURRENTLY \"public\".\"events_idx\""
        );
        assert_eq!(
            reindex(&index, ActionMode::Blocking),
            "REINDEX INDEX \"public\".\"events_idx\""
        );
    }

    #[test]
    fn rewrites_index_definition_for_replacement() {
        let index = target("events_tenant_idx", RelationKind::Index);
        let replacement = replacement_index(&index).unwrap();

        let sql = replacement_definition(
            "CREATE UNIQUE INDEX events_tenant_idx ON public.events USING btree (tenant_id, id)",
            &replacement,
        )
        .unwrap();

        assert_eq!(
            sql,
            "CREATE UNIQUE INDEX CONCURRENTLY \"events_tenant_idx_kr\" ON public.events USING btree (tenant_id, id)"
        );
    }

    #[test]
    fn replacement_name_stays_within_identifier_limit() {
        let long = "i".repeat(63);
        let index = target(&long, RelationKind::Index);

        let replacement = replacement_index(&index).unwrap();

        assert_eq!(replacement.name().as_str().len(), 63);
        assert!(replacement.name().as_str().ends_with("_kr"));
    }

    #[test]
    fn unexpected_definition_is_rejected() {
        let replacement = target("x_kr", RelationKind::Index);
        assert!(replacement_definition("ALTER INDEX x", &replacement).is_none());
    }
}
