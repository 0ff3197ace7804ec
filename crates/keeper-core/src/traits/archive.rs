//! Archive tier: where aged partitions go before they are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ActionError;
use crate::models::{PartitionDescriptor, SessionSettings};

/// Proof that a partition was moved to the archive tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReceipt {
    pub partition: String,
    pub destination: String,
    pub archived_at: DateTime<Utc>,
}

/// Moves one partition to cheaper storage. Archiving is a distinct action
/// from dropping and is configured separately.
pub trait ArchiveTier: Send + Sync {
    fn archive(
        &self,
        partition: &PartitionDescriptor,
        settings: &SessionSettings,
    ) -> Result<ArchiveReceipt, ActionError>;
}
