//! The set of external collaborators one run works against.

use keeper_core::traits::{ArchiveTier, CatalogReader, Clock, MaintenanceBackend, StateStore};

/// Borrowed handles to the store, archive tier, state database and clock.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub catalog: &'a dyn CatalogReader,
    pub backend: &'a dyn MaintenanceBackend,
    pub archive: &'a dyn ArchiveTier,
    pub state: &'a dyn StateStore,
    pub clock: &'a dyn Clock,
}

impl<'a> Collaborators<'a> {
    /// Use one object for catalog, backend and archive tier, which is how
    /// both the PostgreSQL adapter and the simulated store are built.
    pub fn from_store<S>(store: &'a S, state: &'a dyn StateStore, clock: &'a dyn Clock) -> Self
    where
        S: CatalogReader + MaintenanceBackend + ArchiveTier,
    {
        Self {
            catalog: store,
            backend: store,
            archive: store,
            state,
            clock,
        }
    }
}
