//! Aggregate health report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keeper_core::models::Severity;

use super::checks::HealthFinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub checked_at: DateTime<Utc>,
    pub overall_status: HealthStatus,
    pub catalog_reachable: bool,
    /// Set when the catalog was lost mid-check; the caller decides whether
    /// that is fatal.
    pub connection_lost: bool,
    pub findings: Vec<HealthFinding>,
    pub alerts_emitted: usize,
    pub alerts_suppressed: usize,
}

impl HealthReport {
    /// Unhealthy if any finding is critical, degraded if any is a warning,
    /// otherwise healthy. Suppressed findings still count.
    pub fn derive_overall(findings: &[HealthFinding]) -> HealthStatus {
        let mut worst = HealthStatus::Healthy;
        for finding in findings {
            match finding.severity {
                Severity::Critical => return HealthStatus::Unhealthy,
                Severity::Warning => worst = HealthStatus::Degraded,
                Severity::Info => {}
            }
        }
        worst
    }
}
