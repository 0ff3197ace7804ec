//! Data model shared by every keeper crate.

pub mod alert;
pub mod audit;
pub mod identifiers;
pub mod index;
pub mod lock;
pub mod partition;
pub mod period;
pub mod retention;
pub mod run_record;
pub mod session;
pub mod view;

pub use alert::{AlertRecord, Severity};
pub use audit::{PartitionAction, PartitionAuditEntry, ViewRefreshEntry};
pub use identifiers::{Ident, RelationKind, TargetDescriptor};
pub use index::{bloat_pct, AccessMethod, IndexHealthRecord, IndexStats};
pub use lock::LockChain;
pub use partition::{PartitionDescriptor, PartitionStatus};
pub use period::{MonthPeriod, PeriodRange};
pub use retention::RetentionPolicy;
pub use run_record::{
    FailureDetail, FailureKind, MaintenanceRunRecord, MaintenanceTier, Phase, PhaseOutcome,
    RunStatus,
};
pub use session::SessionSettings;
pub use view::{MaterializedViewDescriptor, RefreshMode, ViewMetadata};
