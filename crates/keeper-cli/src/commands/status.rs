//! `keeper status partitions` and `keeper status indexes`. Read-only.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use chrono::Utc;

use keeper_maintenance::status;

use super::Context;
use crate::output::print_json;

pub fn partitions(ctx: &Context) -> Result<ExitCode> {
    let store = ctx
        .connect_store()
        .context("failed to connect to the store")?;
    let rows = status::partition_status(&store, Utc::now()).context("catalog read failed")?;
    print_json(&rows)?;
    Ok(ExitCode::SUCCESS)
}

pub fn indexes(ctx: &Context) -> Result<ExitCode> {
    let store = ctx
        .connect_store()
        .context("failed to connect to the store")?;
    let records = status::index_health(&store, &ctx.config.bloat).context("catalog read failed")?;
    print_json(&records)?;
    Ok(ExitCode::SUCCESS)
}
