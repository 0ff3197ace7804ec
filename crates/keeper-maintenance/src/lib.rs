//! # keeper-maintenance
//!
//! The maintenance engine. Everything here talks to the store through the
//! collaborator traits in `keeper_core::traits`, so the same code runs
//! against PostgreSQL and against the simulated store in tests.

pub mod bloat;
pub mod collaborators;
pub mod health;
pub mod indexes;
pub mod orchestrator;
pub mod partitions;
pub mod report;
pub mod status;
pub mod views;

pub use bloat::{BloatHeuristic, IndexBloatAnalyzer};
pub use collaborators::Collaborators;
pub use health::{report_unreachable, HealthMonitor, HealthReport, HealthStatus};
pub use indexes::IndexMaintenanceExecutor;
pub use orchestrator::{record_failed_start, MaintenanceOrchestrator};
pub use partitions::PartitionLifecycleManager;
pub use report::PhaseReport;
pub use views::MaterializedViewRefresher;
