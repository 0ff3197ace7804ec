//! `keeper`: scheduled maintenance entry points and read-only status.
//!
//! Scheduling is external: cron (or any scheduler) invokes `keeper daily`
//! and `keeper weekly`. Every command prints JSON on stdout; logs go to
//! stderr.

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use keeper_core::config::CliOverrides;
use keeper_core::models::{MaintenanceTier, Severity};

#[derive(Parser)]
#[command(author, version, about = "Automated database maintenance orchestrator")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Project root holding keeper.toml.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Store connection URL (overrides store.url).
    #[arg(long, global = true)]
    store_url: Option<String>,
    /// State database path (overrides state.path).
    #[arg(long, global = true)]
    state: Option<String>,
    /// Lock timeout per action in milliseconds.
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,
    /// Bloat percentage above which an index is rebuilt.
    #[arg(long, global = true)]
    bloat_threshold_pct: Option<f64>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily tier: everything except index rebuilds.
    Daily,
    /// Run the weekly tier: every phase, index rebuilds included.
    Weekly,
    /// Run the health checks once and emit alerts.
    Health,
    /// Show partition or index status.
    #[command(subcommand)]
    Status(StatusCommand),
    /// Show recent alerts.
    Alerts {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Only this severity and above.
        #[arg(long, value_enum)]
        severity: Option<SeverityArg>,
    },
    /// Show recent maintenance runs.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum StatusCommand {
    /// Every partition with its derived status.
    Partitions,
    /// Bloat estimate of every valid index.
    Indexes,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.global.json_logs {
        keeper_core::tracing::init_tracing_json();
    } else {
        keeper_core::tracing::init_tracing();
    }
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = CliOverrides {
        store_url: cli.global.store_url,
        state_path: cli.global.state,
        bloat_threshold_pct: cli.global.bloat_threshold_pct,
        lock_timeout_ms: cli.global.lock_timeout_ms,
    };
    let ctx = commands::Context::load(cli.global.root, &overrides)?;
    match cli.command {
        Command::Daily => commands::run::execute(&ctx, MaintenanceTier::Daily),
        Command::Weekly => commands::run::execute(&ctx, MaintenanceTier::Weekly),
        Command::Health => commands::health::execute(&ctx),
        Command::Status(StatusCommand::Partitions) => commands::status::partitions(&ctx),
        Command::Status(StatusCommand::Indexes) => commands::status::indexes(&ctx),
        Command::Alerts { limit, severity } => {
            commands::history::alerts(&ctx, limit, severity.map(Severity::from))
        }
        Command::Runs { limit } => commands::history::runs(&ctx, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_tier_commands_with_global_flags() {
        let cli = Cli::try_parse_from([
            "keeper",
            "weekly",
            "--store-url",
            "postgres://localhost/app",
            "--lock-timeout-ms",
            "2000",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Weekly));
        assert_eq!(cli.global.lock_timeout_ms, Some(2000));
    }

    #[test]
    fn parses_status_and_alert_filters() {
        let cli = Cli::try_parse_from(["keeper", "status", "indexes"]).unwrap();
        assert!(matches!(cli.command, Command::Status(StatusCommand::Indexes)));

        let cli = Cli::try_parse_from(["keeper", "alerts", "--severity", "critical"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Alerts {
                severity: Some(SeverityArg::Critical),
                limit: 50
            }
        ));
    }

    #[test]
    fn rejects_unknown_tier() {
        assert!(Cli::try_parse_from(["keeper", "monthly"]).is_err());
    }
}
