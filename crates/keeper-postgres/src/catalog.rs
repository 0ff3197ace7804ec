//! Catalog queries and row decoding.
//!
//! Names that fail identifier validation are logged and left out: they are
//! never maintained, and never formatted into DDL.

use tokio_postgres::Row;

use keeper_core::models::{
    AccessMethod, IndexStats, LockChain, PartitionDescriptor, RelationKind, TargetDescriptor,
    ViewMetadata,
};

use crate::bounds::parse_range_bound;

const SYSTEM_SCHEMAS: &str = "('pg_catalog', 'information_schema', 'pg_toast')";

pub const PING_SQL: &str = "SELECT 1";

pub fn partitioned_entities_sql() -> String {
    format!(
        "SELECT n.nspname, c.relname \
         FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE c.relkind = 'p' AND NOT c.relispartition AND n.nspname NOT IN {SYSTEM_SCHEMAS} \
         ORDER BY 1, 2"
    )
}

pub const ENTITY_EXISTS_SQL: &str = "SELECT 1 \
     FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relkind = 'p' AND n.nspname = $1 AND c.relname = $2";

pub const LIST_PARTITIONS_SQL: &str = "SELECT cn.nspname, c.relname, \
            pg_get_expr(c.relpartbound, c.oid), \
            pg_total_relation_size(c.oid), \
            COALESCE(t.spcname, '') \
     FROM pg_inherits i \
     JOIN pg_class c ON c.oid = i.inhrelid \
     JOIN pg_namespace cn ON cn.oid = c.relnamespace \
     JOIN pg_class p ON p.oid = i.inhparent \
     JOIN pg_namespace pn ON pn.oid = p.relnamespace \
     LEFT JOIN pg_tablespace t ON t.oid = c.reltablespace \
     WHERE pn.nspname = $1 AND p.relname = $2";

pub const INDEX_STATS_SQL: &str = "SELECT s.schemaname, s.indexrelname, s.relname, t.relispartition, \
            am.amname, pg_relation_size(s.indexrelid), s.idx_scan, \
            GREATEST(t.reltuples, 0)::bigint, \
            COALESCE((SELECT SUM(st.avg_width) FROM pg_attribute a \
                      JOIN pg_stats st ON st.schemaname = s.schemaname \
                       AND st.tablename = s.relname AND st.attname = a.attname \
                      WHERE a.attrelid = s.relid AND a.attnum = ANY(x.indkey::int2[])), 0)::int4, \
            current_setting('block_size')::bigint, \
            (x.indisprimary OR EXISTS (SELECT 1 FROM pg_constraint con WHERE con.conindid = s.indexrelid)), \
            x.indisvalid \
     FROM pg_stat_user_indexes s \
     JOIN pg_index x ON x.indexrelid = s.indexrelid \
     JOIN pg_class i ON i.oid = s.indexrelid \
     JOIN pg_am am ON am.oid = i.relam \
     JOIN pg_class t ON t.oid = s.relid \
     WHERE x.indisvalid";

pub fn invalid_indexes_sql() -> String {
    format!(
        "SELECT n.nspname, c.relname \
         FROM pg_index x JOIN pg_class c ON c.oid = x.indexrelid \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE NOT x.indisvalid AND n.nspname NOT IN {SYSTEM_SCHEMAS}"
    )
}

pub const MATERIALIZED_VIEWS_SQL: &str = "SELECT n.nspname, c.relname, c.relispopulated, \
            EXISTS (SELECT 1 FROM pg_index x WHERE x.indrelid = c.oid \
                    AND x.indisunique AND x.indisvalid AND x.indpred IS NULL) \
     FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relkind = 'm'";

pub const LOCK_CHAINS_SQL: &str = "SELECT a.pid, b.pid, \
            (SELECT format('%I.%I', rn.nspname, rc.relname) FROM pg_locks l \
             JOIN pg_class rc ON rc.oid = l.relation \
             JOIN pg_namespace rn ON rn.oid = rc.relnamespace \
             WHERE l.pid = a.pid AND NOT l.granted LIMIT 1), \
            EXTRACT(EPOCH FROM (now() - COALESCE(a.query_start, now())))::float8, \
            COALESCE(a.query, '') \
     FROM pg_stat_activity a \
     CROSS JOIN LATERAL unnest(pg_blocking_pids(a.pid)) AS b(pid)";

pub const INDEX_DEFINITION_SQL: &str = "SELECT pg_get_indexdef(c.oid) \
     FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relkind = 'i' AND n.nspname = $1 AND c.relname = $2";

pub const TRY_LOCK_SQL: &str = "SELECT pg_try_advisory_lock(hashtext($1))";

pub const UNLOCK_SQL: &str = "SELECT pg_advisory_unlock(hashtext($1))";

/// Validate a catalog name pair; invalid names are logged and skipped.
pub fn descriptor(schema: &str, name: &str, kind: RelationKind) -> Option<TargetDescriptor> {
    match TargetDescriptor::resolve(schema, name, kind) {
        Ok(target) => Some(target),
        Err(err) => {
            tracing::warn!(
                event = "identifier_rejected",
                schema = %schema,
                name = %name,
                kind = kind.as_str(),
                error = %err,
                "catalog object skipped"
            );
            None
        }
    }
}

pub fn entity_row(row: &Row) -> Result<Option<TargetDescriptor>, tokio_postgres::Error> {
    let schema: String = row.try_get(0)?;
    let name: String = row.try_get(1)?;
    Ok(descriptor(&schema, &name, RelationKind::PartitionedTable))
}

pub fn index_target_row(row: &Row) -> Result<Option<TargetDescriptor>, tokio_postgres::Error> {
    let schema: String = row.try_get(0)?;
    let name: String = row.try_get(1)?;
    Ok(descriptor(&schema, &name, RelationKind::Index))
}

/// A partition row. Partitions without a plain date range (default
/// partitions, list partitions) are not managed and come back as `None`.
pub fn partition_row(
    row: &Row,
    parent: &TargetDescriptor,
    archive_tablespace: Option<&str>,
) -> Result<Option<PartitionDescriptor>, tokio_postgres::Error> {
    let schema: String = row.try_get(0)?;
    let name: String = row.try_get(1)?;
    let bound: Option<String> = row.try_get(2)?;
    let size: i64 = row.try_get(3)?;
    let tablespace: String = row.try_get(4)?;

    let Some(range) = bound.as_deref().and_then(parse_range_bound) else {
        tracing::debug!(partition = %name, "partition without a date range skipped");
        return Ok(None);
    };
    let Some(target) = descriptor(&schema, &name, RelationKind::Partition) else {
        return Ok(None);
    };
    Ok(Some(PartitionDescriptor {
        target,
        entity: parent.name().as_str().to_string(),
        range,
        created_at: None,
        size_bytes: non_negative(size),
        archived: archive_tablespace.is_some_and(|ts| ts == tablespace),
    }))
}

pub fn index_stats_row(row: &Row) -> Result<Option<IndexStats>, tokio_postgres::Error> {
    let schema: String = row.try_get(0)?;
    let index_name: String = row.try_get(1)?;
    let table_name: String = row.try_get(2)?;
    let is_partition: bool = row.try_get(3)?;
    let access_method: String = row.try_get(4)?;
    let size: i64 = row.try_get(5)?;
    let scans: Option<i64> = row.try_get(6)?;
    let rows: i64 = row.try_get(7)?;
    let key_width: i32 = row.try_get(8)?;
    let page_size: i64 = row.try_get(9)?;
    let constraint_backing: bool = row.try_get(10)?;
    let valid: bool = row.try_get(11)?;

    let table_kind = if is_partition {
        RelationKind::Partition
    } else {
        RelationKind::Table
    };
    let (Some(index), Some(table)) = (
        descriptor(&schema, &index_name, RelationKind::Index),
        descriptor(&schema, &table_name, table_kind),
    ) else {
        return Ok(None);
    };
    Ok(Some(IndexStats {
        index,
        table,
        access_method: AccessMethod::from_name(&access_method),
        size_bytes: non_negative(size),
        scan_count: non_negative(scans.unwrap_or(0)),
        row_count: non_negative(rows),
        avg_key_width: u32::try_from(key_width).unwrap_or(0),
        page_size: non_negative(page_size),
        constraint_backing,
        valid,
    }))
}

pub fn view_row(row: &Row) -> Result<Option<ViewMetadata>, tokio_postgres::Error> {
    let schema: String = row.try_get(0)?;
    let name: String = row.try_get(1)?;
    let populated: bool = row.try_get(2)?;
    let has_unique_index: bool = row.try_get(3)?;
    Ok(
        descriptor(&schema, &name, RelationKind::MaterializedView).map(|target| ViewMetadata {
            target,
            has_unique_index,
            populated,
        }),
    )
}

pub fn lock_chain_row(row: &Row) -> Result<LockChain, tokio_postgres::Error> {
    Ok(LockChain {
        blocked_pid: row.try_get(0)?,
        blocking_pid: row.try_get(1)?,
        relation: row.try_get(2)?,
        wait_secs: row.try_get(3)?,
        blocked_query: row.try_get(4)?,
    })
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
