//! SQLSTATE classification into keeper's error taxonomy.

use keeper_core::errors::{ActionError, CatalogError};
use keeper_core::models::SessionSettings;

/// Which bound was active when an action failed, for the error payload.
#[derive(Debug, Clone)]
pub struct ActionContext<'a> {
    pub target: &'a str,
    pub settings: &'a SessionSettings,
}

pub fn action_error(err: &tokio_postgres::Error, ctx: &ActionContext<'_>) -> ActionError {
    classify_action(sqlstate(err), err.is_closed(), &message(err), ctx)
}

pub fn catalog_error(err: &tokio_postgres::Error) -> CatalogError {
    classify_catalog(sqlstate(err), err.is_closed(), &message(err))
}

/// Map a SQLSTATE (or a closed connection) onto [`ActionError`].
pub fn classify_action(
    code: Option<&str>,
    closed: bool,
    message: &str,
    ctx: &ActionContext<'_>,
) -> ActionError {
    if closed || code.is_some_and(is_connection_class) {
        return ActionError::ConnectionLost {
            message: message.to_string(),
        };
    }
    let target = ctx.target.to_string();
    match code {
        // lock_not_available
        Some("55P03") => ActionError::LockTimeout {
            target,
            waited_ms: ctx.settings.lock_timeout_ms(),
        },
        // query_canceled, raised by statement_timeout
        Some("57014") => ActionError::Timeout {
            target,
            limit_ms: ctx.settings.statement_timeout_ms().unwrap_or(0),
        },
        // feature_not_supported, object_not_in_prerequisite_state
        Some("0A000") | Some("55000") => ActionError::Unsupported {
            target,
            reason: message.to_string(),
        },
        _ => ActionError::Failed {
            target,
            message: message.to_string(),
        },
    }
}

pub fn classify_catalog(code: Option<&str>, closed: bool, message: &str) -> CatalogError {
    if closed || code.is_some_and(is_connection_class) {
        CatalogError::ConnectionLost {
            message: message.to_string(),
        }
    } else {
        CatalogError::QueryFailed {
            message: message.to_string(),
        }
    }
}

/// Class 08 (connection exception) and the shutdown codes of class 57P.
fn is_connection_class(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

fn sqlstate(err: &tokio_postgres::Error) -> Option<&str> {
    err.code().map(|state| state.code())
}

fn message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => db.message().to_string(),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> SessionSettings {
        SessionSettings::new(Duration::from_millis(5000), Some(Duration::from_secs(300)))
    }

    fn classify(code: Option<&str>, closed: bool) -> ActionError {
        let settings = settings();
        let ctx = ActionContext {
            target: "public.events_idx",
            settings: &settings,
        };
        classify_action(code, closed, "boom", &ctx)
    }

    #[test]
    fn lock_not_available_is_transient() {
        let err = classify(Some("55P03"), false);
        assert!(err.is_transient());
        assert!(matches!(err, ActionError::LockTimeout { waited_ms: 5000, .. }));
    }

    #[test]
    fn statement_timeout_carries_the_bound() {
        assert!(matches!(
            classify(Some("57014"), false),
            ActionError::Timeout {
                limit_ms: 300_000,
                ..
            }
        ));
    }

    #[test]
    fn unsupported_concurrent_paths_allow_fallback() {
        assert!(classify(Some("0A000"), false).allows_fallback());
        assert!(classify(Some("55000"), false).allows_fallback());
    }

    #[test]
    fn connection_failures_are_fatal() {
        assert!(classify(None, true).is_connection_loss());
        assert!(classify(Some("08006"), false).is_connection_loss());
        assert!(classify(Some("57P01"), false).is_connection_loss());
        assert!(classify_catalog(Some("08003"), false, "gone").is_connection_loss());
    }

    #[test]
    fn anything_else_is_per_object() {
        assert!(matches!(classify(Some("42P01"), false), ActionError::Failed { .. }));
        assert!(!classify_catalog(Some("42501"), false, "denied").is_connection_loss());
    }
}
