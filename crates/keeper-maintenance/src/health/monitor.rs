//! Runs every health check and emits alerts through the state store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use keeper_core::config::HealthConfig;
use keeper_core::errors::{CatalogError, KeeperErrorCode, MaintenanceError, StorageError};
use keeper_core::events::{AlertEvent, EventDispatcher};
use keeper_core::models::{AlertRecord, RelationKind, RetentionPolicy, Severity, TargetDescriptor};
use keeper_core::traits::{Clock, StateStore};
use keeper_core::tracing::events;
use keeper_core::KeeperConfig;

use super::checks::{self, HealthFinding};
use super::report::HealthReport;
use crate::collaborators::Collaborators;

pub struct HealthMonitor<'a> {
    deps: Collaborators<'a>,
    policies: Vec<RetentionPolicy>,
    health: HealthConfig,
    events: EventDispatcher,
}

impl<'a> HealthMonitor<'a> {
    pub fn new(deps: Collaborators<'a>, config: &KeeperConfig) -> Self {
        Self {
            deps,
            policies: config.partitions.clone(),
            health: config.health.clone(),
            events: EventDispatcher::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Run every check once.
    pub fn check(&self) -> Result<HealthReport, MaintenanceError> {
        self.check_excluding(None)
    }

    /// Run every check, ignoring `exclude_run` in the stuck-run check. The
    /// orchestrator passes its own run here.
    pub fn check_excluding(
        &self,
        exclude_run: Option<Uuid>,
    ) -> Result<HealthReport, MaintenanceError> {
        let now = self.deps.clock.now();
        let mut findings = Vec::new();
        let mut catalog_reachable = true;
        let mut connection_lost = false;

        match self.catalog_findings(now) {
            Ok(found) => findings.extend(found),
            Err(err) => {
                catalog_reachable = false;
                connection_lost = err.is_connection_loss();
                findings.push(catalog_unreachable(&err));
            }
        }

        let running: Vec<_> = self
            .deps
            .state
            .running_runs()?
            .into_iter()
            .filter(|run| Some(run.run_id) != exclude_run)
            .collect();
        findings.extend(checks::stuck_runs(
            &running,
            self.health.effective_max_run_duration(),
            now,
        ));

        let mut alerts_emitted = 0;
        let mut alerts_suppressed = 0;
        for finding in findings.iter_mut() {
            if self.emit(finding, now)? {
                alerts_emitted += 1;
            } else {
                finding.suppressed = true;
                alerts_suppressed += 1;
            }
        }

        Ok(HealthReport {
            checked_at: now,
            overall_status: HealthReport::derive_overall(&findings),
            catalog_reachable,
            connection_lost,
            findings,
            alerts_emitted,
            alerts_suppressed,
        })
    }

    fn catalog_findings(&self, now: DateTime<Utc>) -> Result<Vec<HealthFinding>, CatalogError> {
        self.deps.catalog.ping()?;
        let mut findings = Vec::new();
        let max_size = self.health.effective_max_partition_size_bytes();

        for policy in &self.policies {
            let qualified = policy.qualified_entity();
            let entity = match TargetDescriptor::resolve(
                &policy.schema,
                &policy.entity_type,
                RelationKind::PartitionedTable,
            ) {
                Ok(entity) => entity,
                Err(err) => {
                    findings.push(missing_entity(&qualified, &err));
                    continue;
                }
            };
            let partitions = match self.deps.catalog.list_partitions(&entity) {
                Ok(partitions) => partitions,
                Err(err @ CatalogError::UnresolvedTarget { .. }) => {
                    findings.push(missing_entity(&qualified, &err));
                    continue;
                }
                Err(err) => return Err(err),
            };
            let lookahead = self.health.effective_lookahead_periods(policy.future_periods);
            findings.extend(checks::partition_coverage(&entity, &partitions, lookahead, now));
            findings.extend(checks::oversized_partitions(&partitions, max_size));
        }

        let chains = self.deps.catalog.blocking_lock_chains()?;
        findings.extend(checks::lock_contention(
            &chains,
            self.health.effective_lock_wait_alert_secs(),
        ));
        Ok(findings)
    }

    /// Emit `finding` subject to the alert cooldown. Returns whether the
    /// alert was written.
    pub fn emit(&self, finding: &HealthFinding, now: DateTime<Utc>) -> Result<bool, StorageError> {
        emit_with_cooldown(self.deps.state, &self.health, &self.events, finding, now)
    }
}

/// Report for a store that could not be reached at all. The "catalog
/// unreachable" alert goes through the usual cooldown; stuck runs are still
/// checked against the state database.
pub fn report_unreachable(
    state: &dyn StateStore,
    clock: &dyn Clock,
    config: &KeeperConfig,
    err: &CatalogError,
) -> Result<HealthReport, MaintenanceError> {
    let now = clock.now();
    let mut findings = vec![catalog_unreachable(err)];
    findings.extend(checks::stuck_runs(
        &state.running_runs()?,
        config.health.effective_max_run_duration(),
        now,
    ));

    let events = EventDispatcher::new();
    let mut alerts_emitted = 0;
    let mut alerts_suppressed = 0;
    for finding in findings.iter_mut() {
        if emit_with_cooldown(state, &config.health, &events, finding, now)? {
            alerts_emitted += 1;
        } else {
            finding.suppressed = true;
            alerts_suppressed += 1;
        }
    }

    Ok(HealthReport {
        checked_at: now,
        overall_status: HealthReport::derive_overall(&findings),
        catalog_reachable: false,
        connection_lost: err.is_connection_loss(),
        findings,
        alerts_emitted,
        alerts_suppressed,
    })
}

/// Emit unless an identical alert (same subject and message) was emitted
/// inside the cooldown window. Returns whether the alert was written.
fn emit_with_cooldown(
    state: &dyn StateStore,
    health: &HealthConfig,
    dispatcher: &EventDispatcher,
    finding: &HealthFinding,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let cooldown = chrono::Duration::from_std(health.effective_alert_cooldown())
        .unwrap_or_else(|_| chrono::Duration::zero());
    let since = now.checked_sub_signed(cooldown).unwrap_or(DateTime::<Utc>::MIN_UTC);
    if state.recent_alert_exists(&finding.subject, &finding.message, since)? {
        events::alert_suppressed(&finding.subject, &finding.message);
        return Ok(false);
    }
    let alert = AlertRecord::new(
        finding.severity,
        finding.subject.clone(),
        finding.message.clone(),
        finding.detail.clone(),
        now,
    );
    state.emit_alert(&alert)?;
    events::alert_emitted(alert.severity.as_str(), &alert.subject, &alert.message);
    dispatcher.emit_alert(&AlertEvent { alert });
    Ok(true)
}

fn catalog_unreachable(err: &CatalogError) -> HealthFinding {
    HealthFinding::new(
        Severity::Critical,
        "catalog",
        "catalog unreachable",
        serde_json::json!({ "error_code": err.error_code(), "message": err.to_string() }),
    )
}

fn missing_entity(qualified: &str, err: &CatalogError) -> HealthFinding {
    HealthFinding::new(
        Severity::Warning,
        format!("partition:{qualified}"),
        "partitioned entity not found in catalog",
        serde_json::json!({ "error_code": err.error_code(), "message": err.to_string() }),
    )
}
