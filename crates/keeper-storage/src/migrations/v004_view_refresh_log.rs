//! V004: materialized-view refresh log.

pub const MIGRATION_SQL: &str = r#"
-- The store does not track refresh times, so staleness is computed
-- from the newest row per view.
CREATE TABLE IF NOT EXISTS view_refresh_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT,
    view_name TEXT NOT NULL,
    mode TEXT NOT NULL CHECK (mode IN ('concurrent', 'blocking')),
    refreshed_at INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL DEFAULT 0
) STRICT;

CREATE INDEX IF NOT EXISTS idx_view_refresh_log_view
    ON view_refresh_log(view_name, refreshed_at);
"#;
