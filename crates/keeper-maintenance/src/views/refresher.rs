//! Staleness-driven refresh with a concurrent-first strategy.

use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use keeper_core::config::{TimeoutConfig, ViewConfig};
use keeper_core::errors::{ActionError, KeeperErrorCode, MaintenanceError};
use keeper_core::models::{
    FailureDetail, FailureKind, MaterializedViewDescriptor, Phase, RefreshMode, ViewRefreshEntry,
};
use keeper_core::traits::ActionMode;
use keeper_core::tracing::events;

use crate::collaborators::Collaborators;
use crate::report::{classify_action, classify_catalog, PhaseReport};

const PHASE: Phase = Phase::ViewRefresh;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Fresh,
    Refreshed { mode: ActionMode, duration_ms: u64 },
    Deferred,
    Failed,
}

pub struct MaterializedViewRefresher<'a> {
    deps: Collaborators<'a>,
    views: ViewConfig,
    timeouts: TimeoutConfig,
    run_id: Option<Uuid>,
}

impl<'a> MaterializedViewRefresher<'a> {
    pub fn new(deps: Collaborators<'a>, views: ViewConfig, timeouts: TimeoutConfig) -> Self {
        Self {
            deps,
            views,
            timeouts,
            run_id: None,
        }
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Managed views from the catalog, joined with their configured policy
    /// and the last successful refresh from the state store.
    pub fn tracked_views(&self) -> Result<Vec<MaterializedViewDescriptor>, MaintenanceError> {
        let mut tracked = Vec::new();
        for meta in self.deps.catalog.materialized_views()? {
            let schema = meta.target.schema().as_str();
            let name = meta.target.name().as_str();
            let Some((max_staleness, refresh_mode)) = self.views.policy_for(schema, name) else {
                continue;
            };
            let last_refreshed_at = self
                .deps
                .state
                .last_view_refresh(&meta.target.qualified_name())?;
            tracked.push(MaterializedViewDescriptor {
                target: meta.target,
                last_refreshed_at,
                max_staleness,
                refresh_mode,
                has_unique_index: meta.has_unique_index,
                populated: meta.populated,
            });
        }
        Ok(tracked)
    }

    /// Refresh every stale managed view.
    pub fn refresh_all(&self, now: DateTime<Utc>) -> Result<PhaseReport, MaintenanceError> {
        let mut report = PhaseReport::new();
        self.refresh_all_into(now, &mut report)?;
        Ok(report)
    }

    /// [`Self::refresh_all`] accumulating into `report`, so views refreshed
    /// before a fatal error stay accounted for.
    pub fn refresh_all_into(
        &self,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<(), MaintenanceError> {
        let views = match self.tracked_views() {
            Ok(views) => views,
            Err(MaintenanceError::Catalog(err)) => {
                report.record_failure(classify_catalog(PHASE, "materialized_views", err)?);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        for view in &views {
            self.refresh_if_stale(view, now, report)?;
        }
        Ok(())
    }

    /// Refresh `view` when its staleness exceeds its bound. A view with no
    /// recorded refresh is stale.
    pub fn refresh_if_stale(
        &self,
        view: &MaterializedViewDescriptor,
        now: DateTime<Utc>,
        report: &mut PhaseReport,
    ) -> Result<RefreshOutcome, MaintenanceError> {
        if !view.is_stale(now) {
            report.record_skip();
            return Ok(RefreshOutcome::Fresh);
        }

        let object = view.target.qualified_name();
        let mut attempts: Vec<(ActionMode, ActionError)> = Vec::new();

        if view.refresh_mode == RefreshMode::Concurrent {
            let attempt = if view.supports_concurrent_refresh() {
                self.attempt(view, ActionMode::Concurrent)
            } else {
                let reason = if view.populated {
                    "no unique index"
                } else {
                    "view is not populated"
                };
                Err(ActionError::Unsupported {
                    target: object.clone(),
                    reason: reason.to_string(),
                })
            };
            match attempt {
                Ok(duration_ms) => {
                    return self.succeeded(view, ActionMode::Concurrent, duration_ms, report)
                }
                Err(err) if err.allows_fallback() => {
                    events::fallback_engaged(&object, &err.to_string());
                    attempts.push((ActionMode::Concurrent, err));
                }
                Err(err) => return self.failed(view, attempts, err, ActionMode::Concurrent, report),
            }
        }

        match self.attempt(view, ActionMode::Blocking) {
            Ok(duration_ms) => self.succeeded(view, ActionMode::Blocking, duration_ms, report),
            Err(err) => self.failed(view, attempts, err, ActionMode::Blocking, report),
        }
    }

    fn attempt(
        &self,
        view: &MaterializedViewDescriptor,
        mode: ActionMode,
    ) -> Result<u64, ActionError> {
        let settings = match mode {
            ActionMode::Concurrent => self.timeouts.concurrent_session(),
            ActionMode::Blocking => self.timeouts.fallback_session(),
        };
        let started = Instant::now();
        self.deps.backend.refresh_view(&view.target, mode, &settings)?;
        Ok(started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64)
    }

    fn succeeded(
        &self,
        view: &MaterializedViewDescriptor,
        mode: ActionMode,
        duration_ms: u64,
        report: &mut PhaseReport,
    ) -> Result<RefreshOutcome, MaintenanceError> {
        let object = view.target.qualified_name();
        events::view_refreshed(&object, mode.as_str(), duration_ms);
        report.record_success();

        let entry = ViewRefreshEntry {
            run_id: self.run_id,
            view: object.clone(),
            mode: match mode {
                ActionMode::Concurrent => RefreshMode::Concurrent,
                ActionMode::Blocking => RefreshMode::Blocking,
            },
            refreshed_at: self.deps.clock.now(),
            duration_ms,
        };
        if let Err(err) = self.deps.state.record_view_refresh(&entry) {
            report.record_note(FailureDetail::new(
                PHASE,
                &object,
                FailureKind::PerObject,
                format!("refresh succeeded but refresh time was not persisted: {err}"),
            ));
        }
        Ok(RefreshOutcome::Refreshed { mode, duration_ms })
    }

    fn failed(
        &self,
        view: &MaterializedViewDescriptor,
        mut attempts: Vec<(ActionMode, ActionError)>,
        err: ActionError,
        mode: ActionMode,
        report: &mut PhaseReport,
    ) -> Result<RefreshOutcome, MaintenanceError> {
        let object = view.target.qualified_name();
        let detail = classify_action(PHASE, &object, err.clone())?;
        let deferred = detail.kind == FailureKind::Transient;
        attempts.push((mode, err));
        let attempts: Vec<serde_json::Value> = attempts
            .iter()
            .map(|(mode, error)| {
                serde_json::json!({
                    "mode": mode.as_str(),
                    "error_code": error.error_code(),
                    "message": error.to_string(),
                })
            })
            .collect();
        report.record_failure(detail.merge_context(serde_json::json!({
            "view": object,
            "attempts": attempts,
        })));
        Ok(if deferred {
            RefreshOutcome::Deferred
        } else {
            RefreshOutcome::Failed
        })
    }
}
