//! JSON output on stdout.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to serialize output")?;
    writeln!(stdout).context("failed to write output")?;
    Ok(())
}
