//! Health monitoring: coverage, size, stuck-run and lock-contention checks,
//! alert emission with cooldown, and an aggregate status.

pub mod checks;
pub mod monitor;
pub mod report;

pub use checks::HealthFinding;
pub use monitor::{report_unreachable, HealthMonitor};
pub use report::{HealthReport, HealthStatus};
