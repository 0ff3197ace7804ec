//! State-database errors.

use super::error_code::{self, KeeperErrorCode};

/// Errors raised by the SQLite state store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("record not found: {what}")]
    NotFound { what: String },
}

impl KeeperErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
