//! V005: index health snapshots.

pub const MIGRATION_SQL: &str = r#"
-- Analyzer output per run, for bloat trends.
CREATE TABLE IF NOT EXISTS index_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT,
    index_name TEXT NOT NULL,
    table_name TEXT NOT NULL,
    access_method TEXT NOT NULL,
    current_size_bytes INTEGER NOT NULL,
    estimated_ideal_size_bytes INTEGER NOT NULL,
    bloat_pct REAL NOT NULL,
    scan_count INTEGER NOT NULL,
    constraint_backing INTEGER NOT NULL,
    flagged INTEGER NOT NULL,
    taken_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_index_snapshots_index
    ON index_snapshots(index_name, taken_at);
"#;
