//! Catalog read errors.

use super::error_code::{self, KeeperErrorCode};

/// Errors raised while reading the store's system catalog.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("connection to the store lost: {message}")]
    ConnectionLost { message: String },

    #[error("catalog query failed: {message}")]
    QueryFailed { message: String },

    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("{kind} {name} not found in catalog")]
    UnresolvedTarget { kind: String, name: String },
}

impl CatalogError {
    /// Connection loss is the only catalog failure that is fatal to a run.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }
}

impl KeeperErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionLost { .. } => error_code::CONNECTION_LOST,
            Self::QueryFailed { .. } => error_code::CATALOG_ERROR,
            Self::InvalidIdentifier { .. } => error_code::INVALID_IDENTIFIER,
            Self::UnresolvedTarget { .. } => error_code::UNRESOLVED_TARGET,
        }
    }
}
