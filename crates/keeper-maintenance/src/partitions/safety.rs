//! The guard in front of every archive and drop.
//!
//! A partition whose range covers `now`, or starts after it, is never a
//! removal candidate, whatever the retention windows computed.

use chrono::{DateTime, Utc};

use keeper_core::errors::ActionError;
use keeper_core::models::{PartitionDescriptor, PartitionStatus};
use keeper_core::tracing::events;

pub fn check_removable(
    partition: &PartitionDescriptor,
    action: &str,
    now: DateTime<Utc>,
) -> Result<(), ActionError> {
    let reason = match partition.status(now) {
        PartitionStatus::Current => "partition covers the current instant",
        PartitionStatus::Future => "partition covers a future period",
        PartitionStatus::Historical | PartitionStatus::Archived => return Ok(()),
    };
    let target = partition.target.qualified_name();
    events::guarded_rejection(&target, action, reason);
    Err(ActionError::SafetyViolation {
        target,
        reason: reason.to_string(),
    })
}
