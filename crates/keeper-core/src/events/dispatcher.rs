//! EventDispatcher: synchronous fan-out to registered handlers.

use std::sync::Arc;

use super::handler::MaintenanceEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn MaintenanceEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn MaintenanceEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// A panicking handler does not stop the others from seeing the event.
    fn emit<F: Fn(&dyn MaintenanceEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::error!(event = "handler_panicked", "event handler panicked");
            }
        }
    }

    pub fn emit_run_started(&self, event: &RunStartedEvent) {
        self.emit(|h| h.on_run_started(event));
    }

    pub fn emit_phase_completed(&self, event: &PhaseCompletedEvent) {
        self.emit(|h| h.on_phase_completed(event));
    }

    pub fn emit_action_failed(&self, event: &ActionFailedEvent) {
        self.emit(|h| h.on_action_failed(event));
    }

    pub fn emit_run_finished(&self, event: &RunFinishedEvent) {
        self.emit(|h| h.on_run_finished(event));
    }

    pub fn emit_alert(&self, event: &AlertEvent) {
        self.emit(|h| h.on_alert(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
