//! Alert records, written only by the health monitor and fatal-run path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: Severity,
    /// What the alert is about, e.g. `partition:public.events`.
    pub subject: String,
    pub message: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn new(
        severity: Severity,
        subject: impl Into<String>,
        message: impl Into<String>,
        detail: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
            detail,
            created_at,
        }
    }
}
