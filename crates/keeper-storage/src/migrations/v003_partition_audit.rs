//! V003: partition lifecycle audit.

pub const MIGRATION_SQL: &str = r#"
-- Every create/archive/drop. Drops are written before the DDL runs.
-- Never trimmed.
CREATE TABLE IF NOT EXISTS partition_audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT,
    entity TEXT NOT NULL,
    partition_name TEXT NOT NULL,
    action TEXT NOT NULL CHECK (action IN ('create', 'archive', 'drop')),
    range_start TEXT NOT NULL,
    range_end TEXT NOT NULL,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    detail TEXT,
    recorded_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_partition_audit_entity
    ON partition_audit(entity, recorded_at);
"#;
