//! V001: maintenance run records.

pub const MIGRATION_SQL: &str = r#"
-- One row per maintenance run. Inserted as 'running' before the first
-- phase, updated exactly once with the terminal status.
CREATE TABLE IF NOT EXISTS maintenance_runs (
    run_id TEXT PRIMARY KEY,
    maintenance_type TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    status TEXT NOT NULL CHECK (status IN ('running', 'completed', 'failed')),
    phases_completed TEXT NOT NULL DEFAULT '[]',
    failure_details TEXT NOT NULL DEFAULT '[]',
    phase_outcomes TEXT NOT NULL DEFAULT '[]',
    duration_ms INTEGER
) STRICT;

CREATE INDEX IF NOT EXISTS idx_maintenance_runs_status
    ON maintenance_runs(status);
CREATE INDEX IF NOT EXISTS idx_maintenance_runs_started
    ON maintenance_runs(started_at);
"#;
