//! Errors from a single maintenance action (DDL against one target object).

use super::error_code::{self, KeeperErrorCode};

/// Failure of one mutating action. Classification drives fault isolation:
/// transient and per-object failures are recorded and the run continues,
/// connection loss aborts the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("lock on {target} not acquired within {waited_ms} ms")]
    LockTimeout { target: String, waited_ms: u64 },

    #[error("{target} exceeded the {limit_ms} ms duration bound")]
    Timeout { target: String, limit_ms: u64 },

    #[error("{target}: operation not supported: {reason}")]
    Unsupported { target: String, reason: String },

    #[error("{target}: {message}")]
    Failed { target: String, message: String },

    #[error("connection to the store lost: {message}")]
    ConnectionLost { message: String },

    #[error("{target}: rejected by safety guard: {reason}")]
    SafetyViolation { target: String, reason: String },

    /// A multi-step replacement stopped after the point of no return.
    /// `replacement` names the object left behind for manual follow-up.
    #[error("{target}: {step} failed after the swap began, {replacement} left behind: {message}")]
    Incomplete {
        target: String,
        step: String,
        replacement: String,
        message: String,
    },
}

impl ActionError {
    /// Lock-wait timeouts are retried on the next scheduled run.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }

    /// Whether a failed non-blocking attempt may fall back to the blocking path.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. } | Self::Failed { .. } | Self::Timeout { .. }
        )
    }
}

impl KeeperErrorCode for ActionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LockTimeout { .. } => error_code::LOCK_TIMEOUT,
            Self::Timeout { .. } => error_code::ACTION_TIMEOUT,
            Self::Unsupported { .. } => error_code::UNSUPPORTED,
            Self::Failed { .. } => error_code::ACTION_FAILED,
            Self::ConnectionLost { .. } => error_code::CONNECTION_LOST,
            Self::SafetyViolation { .. } => error_code::SAFETY_VIOLATION,
            Self::Incomplete { .. } => error_code::ACTION_INCOMPLETE,
        }
    }
}
