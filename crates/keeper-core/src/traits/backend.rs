//! Mutating actions against the store.

use crate::errors::ActionError;
use crate::models::{PeriodRange, SessionSettings, TargetDescriptor};

/// Non-blocking or blocking execution of a rebuild or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMode {
    Concurrent,
    Blocking,
}

impl ActionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "concurrent",
            Self::Blocking => "blocking",
        }
    }
}

/// One method per DDL action. Every call applies `settings` for its own
/// duration only and restores the previous session values before returning.
pub trait MaintenanceBackend: Send + Sync {
    fn create_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        range: &PeriodRange,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    fn drop_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    fn rebuild_index(
        &self,
        index: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    /// Build a replacement index concurrently, then swap it in.
    fn recreate_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    fn drop_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    fn refresh_view(
        &self,
        view: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError>;

    fn analyze(&self, table: &TargetDescriptor, settings: &SessionSettings)
        -> Result<(), ActionError>;

    fn vacuum(&self, table: &TargetDescriptor, settings: &SessionSettings)
        -> Result<(), ActionError>;

    /// Non-blocking advisory lock. `Ok(false)` when another session holds it.
    fn try_lock_entity(&self, key: &str) -> Result<bool, ActionError>;

    fn unlock_entity(&self, key: &str) -> Result<(), ActionError>;
}
