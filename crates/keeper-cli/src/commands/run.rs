//! `keeper daily` and `keeper weekly`.

use std::process::ExitCode;

use anyhow::{Context as _, Result};

use keeper_core::models::{MaintenanceTier, RunStatus};
use keeper_core::traits::SystemClock;
use keeper_maintenance::{record_failed_start, Collaborators, MaintenanceOrchestrator};

use super::Context;
use crate::output::print_json;

/// Exit status 1 when the run ends FAILED, including when the store
/// cannot be reached at all.
pub fn execute(ctx: &Context, tier: MaintenanceTier) -> Result<ExitCode> {
    let state = ctx.open_state()?;
    let clock = SystemClock;
    let record = match ctx.connect_store() {
        Ok(store) => {
            let deps = Collaborators::from_store(&store, &state, &clock);
            MaintenanceOrchestrator::new(deps, &ctx.config).run(tier)
        }
        Err(err) => {
            tracing::error!(error = %err, "store unreachable, run recorded as failed");
            record_failed_start(&state, &clock, tier, &err.into())
        }
    }
    .with_context(|| format!("{tier} run could not be recorded"))?;
    print_json(&record)?;

    Ok(match record.status {
        RunStatus::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
