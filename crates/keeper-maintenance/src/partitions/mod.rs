//! Partition lifecycle: keep the current and future periods present,
//! move aged partitions to the archive tier, drop expired ones.
//!
//! Every operation re-reads the catalog, so a second invocation at the same
//! instant performs no mutation.

pub mod naming;
pub mod safety;

use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use keeper_core::config::TimeoutConfig;
use keeper_core::errors::MaintenanceError;
use keeper_core::models::{
    FailureDetail, FailureKind, MonthPeriod, PartitionAction, PartitionAuditEntry,
    PartitionDescriptor, Phase, RetentionPolicy, TargetDescriptor,
};
use keeper_core::tracing::events;

use crate::collaborators::Collaborators;
use crate::report::{classify_action, classify_catalog, PhaseReport};

const PHASE: Phase = Phase::PartitionMaintenance;

pub struct PartitionLifecycleManager<'a> {
    deps: Collaborators<'a>,
    timeouts: TimeoutConfig,
    run_id: Option<Uuid>,
}

impl<'a> PartitionLifecycleManager<'a> {
    pub fn new(deps: Collaborators<'a>, timeouts: TimeoutConfig) -> Self {
        Self {
            deps,
            timeouts,
            run_id: None,
        }
    }

    /// Tag audit entries with the run that produced them.
    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Create, drop and archive for one entity, in that order. Dropping
    /// before archiving avoids moving partitions that are about to go.
    pub fn apply_policy(
        &self,
        entity: &TargetDescriptor,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.apply_policy_into(entity, policy, now, &mut report)?;
        Ok(report)
    }

    /// [`Self::apply_policy`] accumulating into `report`. On a fatal error
    /// the actions already taken stay recorded there.
    pub fn apply_policy_into(
        &self,
        entity: &TargetDescriptor,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        policy.validate()?;
        self.ensure_current_into(entity, now, report)?;
        self.create_future_into(entity, policy.future_periods, now, report)?;
        self.drop_into(entity, policy.drop_after(), now, report)?;
        self.archive_into(entity, policy.archive_after(), now, report)
    }

    /// Create the partition covering `now` when it is missing.
    pub fn ensure_current_partition(
        &self,
        entity: &TargetDescriptor,
        now: DateTime<Utc>,
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.ensure_current_into(entity, now, &mut report)?;
        Ok(report)
    }

    /// Create partitions for the `count` periods after the current one.
    /// Periods already covered are skipped.
    pub fn create_future_partitions(
        &self,
        entity: &TargetDescriptor,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.create_future_into(entity, count, now, &mut report)?;
        Ok(report)
    }

    /// Move every unarchived partition that ended at or before
    /// `now - archive_after` to the archive tier.
    pub fn archive_partitions(
        &self,
        entity: &TargetDescriptor,
        archive_after: Months,
        now: DateTime<Utc>,
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.archive_into(entity, archive_after, now, &mut report)?;
        Ok(report)
    }

    /// Drop every partition that ended at or before `now - drop_after`. The
    /// audit entry is written first; a failed audit write skips the drop.
    pub fn drop_partitions(
        &self,
        entity: &TargetDescriptor,
        drop_after: Months,
        now: DateTime<Utc>,
    ) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.drop_into(entity, drop_after, now, &mut report)?;
        Ok(report)
    }

    fn ensure_current_into(
        &self,
        entity: &TargetDescriptor,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let Some(mut existing) = self.load_partitions(entity, report)? else {
            return Ok(());
        };
        let current = MonthPeriod::containing(now);
        self.create_period(entity, &current, &mut existing, report)
    }

    fn create_future_into(
        &self,
        entity: &TargetDescriptor,
        count: u32,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let Some(mut existing) = self.load_partitions(entity, report)? else {
            return Ok(());
        };
        let current = MonthPeriod::containing(now);
        for offset in 1..=count {
            let period = current.offset(offset as i32);
            self.create_period(entity, &period, &mut existing, report)?;
        }
        Ok(())
    }

    fn archive_into(
        &self,
        entity: &TargetDescriptor,
        archive_after: Months,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let Some(existing) = self.load_partitions(entity, report)? else {
            return Ok(());
        };
        let Some(cutoff) = now.checked_sub_months(archive_after) else {
            return Ok(());
        };
        for partition in existing
            .iter()
            .filter(|p| !p.archived && p.range.end_utc() <= cutoff)
        {
            self.archive_one(entity, partition, now, report)?;
        }
        Ok(())
    }

    fn drop_into(
        &self,
        entity: &TargetDescriptor,
        drop_after: Months,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let Some(existing) = self.load_partitions(entity, report)? else {
            return Ok(());
        };
        let Some(cutoff) = now.checked_sub_months(drop_after) else {
            return Ok(());
        };
        for partition in existing.iter().filter(|p| p.range.end_utc() <= cutoff) {
            self.drop_one(entity, partition, now, report)?;
        }
        Ok(())
    }

    /// Archive a single partition, subject to the safety guard.
    pub fn archive_one(
        &self,
        entity: &TargetDescriptor,
        partition: &PartitionDescriptor,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let object = partition.target.qualified_name();
        if let Err(err) = safety::check_removable(partition, "archive", now) {
            report.record_failure(classify_action(PHASE, &object, err)?);
            return Ok(());
        }
        match self.deps.archive.archive(partition, &self.timeouts.ddl_session()) {
            Ok(receipt) => {
                events::partition_archived(
                    &entity.qualified_name(),
                    &object,
                    &receipt.destination,
                );
                report.record_success();
                self.audit_after(
                    entity,
                    partition,
                    PartitionAction::Archive,
                    Some(receipt.destination),
                    report,
                );
            }
            Err(err) => report.record_failure(classify_action(PHASE, &object, err)?),
        }
        Ok(())
    }

    /// Drop a single partition, subject to the safety guard.
    pub fn drop_one(
        &self,
        entity: &TargetDescriptor,
        partition: &PartitionDescriptor,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let object = partition.target.qualified_name();
        if let Err(err) = safety::check_removable(partition, "drop", now) {
            report.record_failure(classify_action(PHASE, &object, err)?);
            return Ok(());
        }

        let entry = self.audit_entry(entity, partition, PartitionAction::Drop, None);
        if let Err(err) = self.deps.state.record_partition_audit(&entry) {
            report.record_failure(
                FailureDetail::new(
                    PHASE,
                    &object,
                    FailureKind::PerObject,
                    format!("audit write failed, drop skipped: {err}"),
                )
                .with_context(serde_json::json!({ "size_bytes": partition.size_bytes })),
            );
            return Ok(());
        }

        match self
            .deps
            .backend
            .drop_partition(entity, &partition.target, &self.timeouts.ddl_session())
        {
            Ok(()) => {
                events::partition_dropped(&entity.qualified_name(), &object);
                report.record_success();
            }
            Err(err) => report.record_failure(classify_action(PHASE, &object, err)?),
        }
        Ok(())
    }

    fn load_partitions(
        &self,
        entity: &TargetDescriptor,
        report: &mut PhaseReport,
    ) -> Result<Option<Vec<PartitionDescriptor>>, MaintenanceError> {
        match self.deps.catalog.list_partitions(entity) {
            Ok(partitions) => Ok(Some(partitions)),
            Err(err) => {
                report.record_failure(classify_catalog(PHASE, &entity.qualified_name(), err)?);
                Ok(None)
            }
        }
    }

    fn create_period(
        &self,
        entity: &TargetDescriptor,
        period: &MonthPeriod,
        existing: &mut Vec<PartitionDescriptor>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let range = period.range();
        if existing.iter().any(|p| p.range.covers(&range)) {
            report.record_skip();
            return Ok(());
        }

        let object = format!("{}[{}]", entity.qualified_name(), period);
        if let Some(clash) = existing.iter().find(|p| p.range.overlaps(&range)) {
            report.record_failure(FailureDetail::new(
                PHASE,
                &object,
                FailureKind::PerObject,
                format!(
                    "period {} partially overlaps partition {} {}",
                    range,
                    clash.target.qualified_name(),
                    clash.range
                ),
            ));
            return Ok(());
        }

        let target = match naming::partition_target(entity, period) {
            Ok(target) => target,
            Err(err) => {
                report.record_failure(classify_catalog(PHASE, &object, err)?);
                return Ok(());
            }
        };

        let result = self
            .deps
            .backend
            .create_partition(entity, &target, &range, &self.timeouts.ddl_session());
        match result {
            Ok(()) => {
                events::partition_created(
                    &entity.qualified_name(),
                    &target.qualified_name(),
                    &range.to_string(),
                );
                let created = PartitionDescriptor {
                    target,
                    entity: entity.name().as_str().to_string(),
                    range,
                    created_at: Some(self.deps.clock.now()),
                    size_bytes: 0,
                    archived: false,
                };
                report.record_success();
                self.audit_after(entity, &created, PartitionAction::Create, None, report);
                existing.push(created);
            }
            Err(err) => {
                report.record_failure(classify_action(PHASE, &target.qualified_name(), err)?)
            }
        }
        Ok(())
    }

    /// Audit write after an action that already happened. A failure here is
    /// recorded but cannot undo the action.
    fn audit_after(
        &self,
        entity: &TargetDescriptor,
        partition: &PartitionDescriptor,
        action: PartitionAction,
        detail: Option<String>,
        report: &mut PhaseReport,
    ) {
        let entry = self.audit_entry(entity, partition, action, detail);
        if let Err(err) = self.deps.state.record_partition_audit(&entry) {
            let object = partition.target.qualified_name();
            report.record_note(FailureDetail::new(
                PHASE,
                &object,
                FailureKind::PerObject,
                format!("{} succeeded but audit write failed: {err}", action.as_str()),
            ));
        }
    }

    fn audit_entry(
        &self,
        entity: &TargetDescriptor,
        partition: &PartitionDescriptor,
        action: PartitionAction,
        detail: Option<String>,
    ) -> PartitionAuditEntry {
        PartitionAuditEntry {
            run_id: self.run_id,
            entity: entity.qualified_name(),
            partition: partition.target.qualified_name(),
            action,
            range: partition.range,
            size_bytes: partition.size_bytes,
            detail,
            recorded_at: self.deps.clock.now(),
        }
    }
}

