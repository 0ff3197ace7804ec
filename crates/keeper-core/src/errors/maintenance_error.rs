//! Run-level errors. Anything that reaches this type ends the run as FAILED.

use super::error_code::KeeperErrorCode;
use super::{ActionError, CatalogError, ConfigError, PolicyError, StorageError};

/// Fatal errors of a maintenance run or health cycle.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

impl KeeperErrorCode for MaintenanceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::Catalog(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Policy(e) => e.error_code(),
            Self::Action(e) => e.error_code(),
        }
    }
}
