//! Retention policies for partitioned entities.

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

/// Future/archive/drop windows of one partitioned entity, in calendar months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Partitioned table name.
    pub entity_type: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Periods to keep created ahead of the current one.
    pub future_periods: u32,
    pub archive_after_months: u32,
    pub drop_after_months: u32,
}

fn default_schema() -> String {
    "public".to_string()
}

impl RetentionPolicy {
    /// Enforce `drop_after > archive_after > 0` and at least one future period.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.archive_after_months == 0 || self.drop_after_months <= self.archive_after_months {
            return Err(PolicyError::InvalidOrdering {
                entity: self.entity_type.clone(),
                archive_after_months: self.archive_after_months,
                drop_after_months: self.drop_after_months,
            });
        }
        if self.future_periods == 0 {
            return Err(PolicyError::NoFuturePeriods {
                entity: self.entity_type.clone(),
            });
        }
        Ok(())
    }

    pub fn archive_after(&self) -> Months {
        Months::new(self.archive_after_months)
    }

    pub fn drop_after(&self) -> Months {
        Months::new(self.drop_after_months)
    }

    /// `schema.entity`, as used in subjects and lock keys.
    pub fn qualified_entity(&self) -> String {
        format!("{}.{}", self.schema, self.entity_type)
    }
}
