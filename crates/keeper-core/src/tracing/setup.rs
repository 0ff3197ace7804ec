//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "KEEPER_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("keeper=info"))
}

/// Initialize human-readable logging.
///
/// Reads `KEEPER_LOG` for per-subsystem log levels, e.g.
/// `KEEPER_LOG=keeper_maintenance=debug,keeper_postgres=warn`.
/// Falls back to `keeper=info` if unset or invalid. Idempotent.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter())
            .init();
    });
}

/// Initialize JSON logging, for collection by a log shipper. Idempotent, and
/// a no-op after `init_tracing`.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter())
            .init();
    });
}
