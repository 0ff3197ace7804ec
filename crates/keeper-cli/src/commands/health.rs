//! `keeper health`.

use std::process::ExitCode;

use anyhow::{Context as _, Result};

use keeper_core::traits::SystemClock;
use keeper_maintenance::{report_unreachable, Collaborators, HealthMonitor, HealthStatus};

use super::Context;
use crate::output::print_json;

/// Exit status 1 when the store is unhealthy.
pub fn execute(ctx: &Context) -> Result<ExitCode> {
    let state = ctx.open_state()?;
    let clock = SystemClock;
    let report = match ctx.connect_store() {
        Ok(store) => {
            let deps = Collaborators::from_store(&store, &state, &clock);
            HealthMonitor::new(deps, &ctx.config).check()
        }
        Err(err) => report_unreachable(&state, &clock, &ctx.config, &err),
    }
    .context("health check failed")?;
    print_json(&report)?;

    Ok(match report.overall_status {
        HealthStatus::Unhealthy => ExitCode::FAILURE,
        HealthStatus::Healthy | HealthStatus::Degraded => ExitCode::SUCCESS,
    })
}
