//! # keeper-core
//!
//! Foundation crate for the keeper maintenance orchestrator.
//! Defines the data model, collaborator traits, errors, config, tracing
//! setup, and constants. Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod models;
pub mod traits;
pub mod tracing;

// Re-export the most commonly used types at the crate root.
pub use config::KeeperConfig;
pub use errors::{
    ActionError, CatalogError, ConfigError, KeeperErrorCode, MaintenanceError, PolicyError,
    StorageError,
};
pub use models::{
    AlertRecord, FailureDetail, FailureKind, IndexHealthRecord, MaintenanceRunRecord,
    MaintenanceTier, MonthPeriod, PartitionDescriptor, Phase, RetentionPolicy, RunStatus,
    Severity, TargetDescriptor,
};
pub use traits::{ArchiveTier, CatalogReader, Clock, MaintenanceBackend, StateStore};
