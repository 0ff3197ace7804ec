//! Retention-policy errors.

use super::error_code::{self, KeeperErrorCode};

/// Errors raised when a retention policy is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error(
        "retention policy for {entity} must satisfy drop_after > archive_after > 0 \
         (archive_after={archive_after_months}, drop_after={drop_after_months})"
    )]
    InvalidOrdering {
        entity: String,
        archive_after_months: u32,
        drop_after_months: u32,
    },

    #[error("retention policy for {entity} must keep at least one future period")]
    NoFuturePeriods { entity: String },

    #[error("partitioned entity {entity} has no retention policy")]
    MissingPolicy { entity: String },

    #[error("duplicate retention policy for {entity}")]
    Duplicate { entity: String },
}

impl KeeperErrorCode for PolicyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPolicy { .. } => error_code::MISSING_POLICY,
            _ => error_code::INVALID_POLICY,
        }
    }
}
