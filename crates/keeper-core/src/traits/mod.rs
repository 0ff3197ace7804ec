//! Collaborator seams. The maintenance engine depends only on these traits;
//! the PostgreSQL adapter, the SQLite state store and the simulated store in
//! the test fixtures implement them.

pub mod archive;
pub mod backend;
pub mod catalog;
pub mod clock;
pub mod state;

pub use archive::{ArchiveReceipt, ArchiveTier};
pub use backend::{ActionMode, MaintenanceBackend};
pub use catalog::CatalogReader;
pub use clock::{Clock, SystemClock};
pub use state::{StateStore, TrimReport};
