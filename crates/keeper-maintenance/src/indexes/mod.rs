//! Index remediation: rebuild flagged indexes and clear invalid leftovers.

pub mod executor;

pub use executor::{IndexMaintenanceExecutor, RebuildOutcome};
