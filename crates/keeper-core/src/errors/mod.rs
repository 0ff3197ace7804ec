//! Error handling for keeper.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod action_error;
pub mod catalog_error;
pub mod config_error;
pub mod error_code;
pub mod maintenance_error;
pub mod policy_error;
pub mod storage_error;

pub use action_error::ActionError;
pub use catalog_error::CatalogError;
pub use config_error::ConfigError;
pub use error_code::KeeperErrorCode;
pub use maintenance_error::MaintenanceError;
pub use policy_error::PolicyError;
pub use storage_error::StorageError;
