//! `keeper alerts` and `keeper runs`: reads from the state database only.

use std::process::ExitCode;

use anyhow::Result;

use keeper_core::models::Severity;
use keeper_core::traits::StateStore;

use super::Context;
use crate::output::print_json;

pub fn alerts(ctx: &Context, limit: usize, min_severity: Option<Severity>) -> Result<ExitCode> {
    let state = ctx.open_state()?;
    print_json(&state.recent_alerts(limit, min_severity)?)?;
    Ok(ExitCode::SUCCESS)
}

pub fn runs(ctx: &Context, limit: usize) -> Result<ExitCode> {
    let state = ctx.open_state()?;
    print_json(&state.recent_runs(limit)?)?;
    Ok(ExitCode::SUCCESS)
}
