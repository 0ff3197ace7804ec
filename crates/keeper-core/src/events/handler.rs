//! MaintenanceEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Observer of maintenance runs and health cycles.
///
/// Handlers override only the events they care about.
pub trait MaintenanceEventHandler: Send + Sync {
    fn on_run_started(&self, _event: &RunStartedEvent) {}
    fn on_phase_completed(&self, _event: &PhaseCompletedEvent) {}
    fn on_action_failed(&self, _event: &ActionFailedEvent) {}
    fn on_run_finished(&self, _event: &RunFinishedEvent) {}
    fn on_alert(&self, _event: &AlertEvent) {}
}
