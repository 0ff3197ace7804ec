//! V002: alert feed.

pub const MIGRATION_SQL: &str = r#"
-- Append-only. Read by external monitoring through `keeper alerts`.
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    severity TEXT NOT NULL CHECK (severity IN ('info', 'warning', 'critical')),
    subject TEXT NOT NULL,
    message TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT 'null',
    created_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_alerts_created
    ON alerts(created_at);
-- Cooldown lookups.
CREATE INDEX IF NOT EXISTS idx_alerts_subject_message
    ON alerts(subject, message, created_at);
"#;
