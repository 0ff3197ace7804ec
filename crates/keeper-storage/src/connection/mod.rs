//! Connection management: write-serialized + read-pooled.

pub mod pool;
pub mod pragmas;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keeper_core::errors::StorageError;
use rusqlite::Connection;

use self::pool::ReadPool;
use self::pragmas::apply_pragmas;
use crate::migrations;

/// Owns the single write connection and the read connection pool.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a database at the given path, apply pragmas, run migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                    message: format!("create {}: {e}", parent.display()),
                })?;
            }
        }
        let writer = Connection::open(path).map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let readers = ReadPool::open(path, ReadPool::default_size())?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing). Reads go through the
    /// writer, since separate in-memory connections are separate databases.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: None,
            path: None,
        })
    }

    /// Execute a write operation with the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::SqliteError {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Execute a read operation on a pooled connection, or on the writer
    /// for in-memory databases.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match &self.readers {
            Some(pool) => pool.with_conn(f),
            None => self.with_writer(f),
        }
    }

    /// WAL checkpoint (TRUNCATE mode), run after retention trimming.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| StorageError::SqliteError {
                    message: e.to_string(),
                })
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
