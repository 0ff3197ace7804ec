//! Schema migrations using PRAGMA user_version.

pub mod v001_run_records;
pub mod v002_alerts;
pub mod v003_partition_audit;
pub mod v004_view_refresh_log;
pub mod v005_index_snapshots;

use keeper_core::errors::StorageError;
use rusqlite::Connection;

/// Latest schema version.
pub const LATEST_VERSION: u32 = 5;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })?;

    let migrations: &[(&str, u32)] = &[
        (v001_run_records::MIGRATION_SQL, 1),
        (v002_alerts::MIGRATION_SQL, 2),
        (v003_partition_audit::MIGRATION_SQL, 3),
        (v004_view_refresh_log::MIGRATION_SQL, 4),
        (v005_index_snapshots::MIGRATION_SQL, 5),
    ];

    for (sql, version) in migrations {
        if current_version < *version {
            conn.execute_batch(sql)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, "applied migration");
        }
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}
