//! Structured log events for key maintenance operations.
//!
//! Each function emits a `tracing` event with an `event` field so log
//! pipelines can key on it.

pub fn run_started(run_id: &str, tier: &str) {
    tracing::info!(event = "run_started", run_id = %run_id, tier = %tier, "maintenance run started");
}

pub fn run_finished(run_id: &str, status: &str, duration_ms: u64, failures: usize) {
    tracing::info!(
        event = "run_finished",
        run_id = %run_id,
        status = %status,
        duration_ms = duration_ms,
        failures = failures,
        "maintenance run finished"
    );
}

pub fn phase_completed(run_id: &str, phase: &str, succeeded: u32, failed: u32, skipped: u32) {
    tracing::info!(
        event = "phase_completed",
        run_id = %run_id,
        phase = %phase,
        succeeded = succeeded,
        failed = failed,
        skipped = skipped,
        "phase completed"
    );
}

pub fn phase_skipped(run_id: &str, phase: &str, reason: &str) {
    tracing::warn!(
        event = "phase_skipped",
        run_id = %run_id,
        phase = %phase,
        reason = %reason,
        "phase skipped"
    );
}

pub fn partition_created(entity: &str, partition: &str, range: &str) {
    tracing::info!(
        event = "partition_created",
        entity = %entity,
        partition = %partition,
        range = %range,
        "partition created"
    );
}

pub fn partition_archived(entity: &str, partition: &str, destination: &str) {
    tracing::info!(
        event = "partition_archived",
        entity = %entity,
        partition = %partition,
        destination = %destination,
        "partition archived"
    );
}

pub fn partition_dropped(entity: &str, partition: &str) {
    tracing::info!(
        event = "partition_dropped",
        entity = %entity,
        partition = %partition,
        "partition dropped"
    );
}

/// A guard refused an action. Always logged at warn.
pub fn guarded_rejection(object: &str, action: &str, reason: &str) {
    tracing::warn!(
        event = "guarded_rejection",
        object = %object,
        action = %action,
        reason = %reason,
        "action rejected by safety guard"
    );
}

pub fn index_flagged(index: &str, bloat_pct: f64, size_bytes: u64) {
    tracing::info!(
        event = "index_flagged",
        index = %index,
        bloat_pct = bloat_pct,
        size_bytes = size_bytes,
        "index flagged for rebuild"
    );
}

pub fn index_rebuilt(index: &str, mode: &str, duration_ms: u64) {
    tracing::info!(
        event = "index_rebuilt",
        index = %index,
        mode = %mode,
        duration_ms = duration_ms,
        "index rebuilt"
    );
}

pub fn fallback_engaged(object: &str, cause: &str) {
    tracing::warn!(
        event = "fallback_engaged",
        object = %object,
        cause = %cause,
        "non-blocking path failed, using blocking fallback"
    );
}

pub fn view_refreshed(view: &str, mode: &str, duration_ms: u64) {
    tracing::info!(
        event = "view_refreshed",
        view = %view,
        mode = %mode,
        duration_ms = duration_ms,
        "materialized view refreshed"
    );
}

pub fn action_failed(object: &str, kind: &str, error: &str) {
    tracing::warn!(
        event = "action_failed",
        object = %object,
        kind = %kind,
        error = %error,
        "maintenance action failed"
    );
}

pub fn alert_emitted(severity: &str, subject: &str, message: &str) {
    tracing::warn!(
        event = "alert_emitted",
        severity = %severity,
        subject = %subject,
        message = %message,
        "alert emitted"
    );
}

pub fn alert_suppressed(subject: &str, message: &str) {
    tracing::debug!(
        event = "alert_suppressed",
        subject = %subject,
        message = %message,
        "alert suppressed by cooldown"
    );
}
