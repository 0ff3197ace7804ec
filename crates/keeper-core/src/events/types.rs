//! Event payload types.

use crate::models::{AlertRecord, FailureDetail, MaintenanceTier, Phase, PhaseOutcome, RunStatus};

/// Payload for `on_run_started`.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    pub run_id: String,
    pub tier: MaintenanceTier,
}

/// Payload for `on_phase_completed`.
#[derive(Debug, Clone)]
pub struct PhaseCompletedEvent {
    pub run_id: String,
    pub outcome: PhaseOutcome,
}

/// Payload for `on_action_failed`.
#[derive(Debug, Clone)]
pub struct ActionFailedEvent {
    pub run_id: String,
    pub failure: FailureDetail,
}

/// Payload for `on_run_finished`.
#[derive(Debug, Clone)]
pub struct RunFinishedEvent {
    pub run_id: String,
    pub status: RunStatus,
    pub phases_completed: Vec<Phase>,
    pub duration_ms: u64,
}

/// Payload for `on_alert`.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub alert: AlertRecord,
}
