//! Per-entity advisory locks held for the duration of a run.

use keeper_core::constants::ENTITY_LOCK_PREFIX;
use keeper_core::errors::ActionError;
use keeper_core::models::TargetDescriptor;
use keeper_core::traits::MaintenanceBackend;

pub fn entity_lock_key(entity: &TargetDescriptor) -> String {
    format!("{ENTITY_LOCK_PREFIX}{}", entity.qualified_name())
}

/// Releases the advisory lock on drop.
pub struct EntityLockGuard<'a> {
    backend: &'a dyn MaintenanceBackend,
    key: String,
}

impl<'a> EntityLockGuard<'a> {
    /// `Ok(None)` when another session holds the lock.
    pub fn try_acquire(
        backend: &'a dyn MaintenanceBackend,
        entity: &TargetDescriptor,
    ) -> Result<Option<Self>, ActionError> {
        let key = entity_lock_key(entity);
        if backend.try_lock_entity(&key)? {
            tracing::debug!(key = %key, "entity lock acquired");
            Ok(Some(Self { backend, key }))
        } else {
            Ok(None)
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EntityLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.backend.unlock_entity(&self.key) {
            tracing::warn!(key = %self.key, error = %err, "failed to release entity lock");
        }
    }
}
