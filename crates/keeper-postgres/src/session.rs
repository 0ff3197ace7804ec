//! Scoped session settings: captured before an action, applied for its
//! duration, restored afterwards whether or not the action succeeded.

use keeper_core::models::SessionSettings;

pub const CAPTURE_SQL: &str =
    "SELECT current_setting('lock_timeout'), current_setting('statement_timeout')";

/// Session values in force before an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousSettings {
    pub lock_timeout: String,
    pub statement_timeout: String,
}

pub fn apply_sql(settings: &SessionSettings) -> String {
    // 0 disables statement_timeout.
    let statement_ms = settings.statement_timeout_ms().unwrap_or(0);
    format!(
        "SET lock_timeout = '{}ms'; SET statement_timeout = '{}ms'",
        settings.lock_timeout_ms(),
        statement_ms
    )
}

pub fn restore_sql(previous: &PreviousSettings) -> String {
    format!(
        "SET lock_timeout = {}; SET statement_timeout = {}",
        literal(&previous.lock_timeout),
        literal(&previous.statement_timeout)
    )
}

fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
