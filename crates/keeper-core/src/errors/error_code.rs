//! KeeperErrorCode trait: stable error codes for logs, run records, and alerts.

/// Every error enum implements this to expose a stable code string that
/// survives message rewording (alerts and run records key on it).
pub trait KeeperErrorCode {
    /// Returns the error code string (e.g., "LOCK_TIMEOUT").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CONNECTION_LOST: &str = "CONNECTION_LOST";
pub const CATALOG_ERROR: &str = "CATALOG_ERROR";
pub const INVALID_IDENTIFIER: &str = "INVALID_IDENTIFIER";
pub const UNRESOLVED_TARGET: &str = "UNRESOLVED_TARGET";
pub const LOCK_TIMEOUT: &str = "LOCK_TIMEOUT";
pub const ACTION_TIMEOUT: &str = "ACTION_TIMEOUT";
pub const UNSUPPORTED: &str = "UNSUPPORTED";
pub const ACTION_FAILED: &str = "ACTION_FAILED";
pub const ACTION_INCOMPLETE: &str = "ACTION_INCOMPLETE";
pub const SAFETY_VIOLATION: &str = "SAFETY_VIOLATION";
pub const INVALID_POLICY: &str = "INVALID_POLICY";
pub const MISSING_POLICY: &str = "MISSING_POLICY";
