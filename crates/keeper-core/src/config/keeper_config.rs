//! Top-level keeper configuration with layered resolution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{BloatConfig, HealthConfig, StateConfig, StoreConfig, TimeoutConfig, ViewConfig};
use crate::errors::ConfigError;
use crate::models::{Ident, RetentionPolicy};

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`KEEPER_*`)
/// 3. Project config (`keeper.toml` in project root)
/// 4. User config (`~/.keeper/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeeperConfig {
    pub store: StoreConfig,
    pub state: StateConfig,
    pub bloat: BloatConfig,
    pub views: ViewConfig,
    pub timeouts: TimeoutConfig,
    pub health: HealthConfig,
    /// One retention policy per partitioned entity.
    pub partitions: Vec<RetentionPolicy>,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub store_url: Option<String>,
    pub state_path: Option<String>,
    pub bloat_threshold_pct: Option<f64>,
    pub lock_timeout_ms: Option<u64>,
}

impl KeeperConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Lowest priority: user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(err @ ConfigError::ParseError { .. }) => return Err(err),
                    Err(err) => {
                        tracing::warn!(
                            path = %user_config_path.display(),
                            error = %err,
                            "ignoring unreadable user config"
                        );
                    }
                }
            }
        }

        let project_config_path = root.join("keeper.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate thresholds, identifiers and retention policies.
    pub fn validate(config: &KeeperConfig) -> Result<(), ConfigError> {
        let bloat = &config.bloat;
        if let Some(threshold) = bloat.threshold_pct {
            if !(threshold >= 0.0 && threshold.is_finite()) {
                return Err(validation("bloat.threshold_pct", "must be a non-negative number"));
            }
        }
        for (field, value) in [
            ("bloat.btree_fillfactor", bloat.btree_fillfactor),
            ("bloat.conservative_fraction", bloat.conservative_fraction),
        ] {
            if let Some(v) = value {
                if !(v > 0.0 && v <= 1.0) {
                    return Err(validation(field, "must be in (0.0, 1.0]"));
                }
            }
        }
        if let Some(v) = bloat.gin_pages_per_row {
            if !(v > 0.0 && v.is_finite()) {
                return Err(validation("bloat.gin_pages_per_row", "must be greater than 0"));
            }
        }
        if config.timeouts.lock_timeout_ms == Some(0) {
            return Err(validation("timeouts.lock_timeout_ms", "must be greater than 0"));
        }
        if config.timeouts.fallback_max_duration_secs == Some(0) {
            return Err(validation(
                "timeouts.fallback_max_duration_secs",
                "must be greater than 0",
            ));
        }
        if let Some(tablespace) = &config.store.archive_tablespace {
            Ident::new(tablespace)
                .map_err(|e| validation("store.archive_tablespace", &e.to_string()))?;
        }

        let mut seen = HashSet::new();
        for (i, policy) in config.partitions.iter().enumerate() {
            let field = format!("partitions[{i}]");
            policy
                .validate()
                .map_err(|e| validation(&field, &e.to_string()))?;
            Ident::new(&policy.entity_type)
                .and_then(|_| Ident::new(&policy.schema))
                .map_err(|e| validation(&field, &e.to_string()))?;
            if !seen.insert(policy.qualified_entity()) {
                return Err(validation(&field, "duplicate retention policy"));
            }
        }

        for (i, view) in config.views.tracked.iter().enumerate() {
            Ident::new(&view.name)
                .and_then(|_| Ident::new(&view.schema))
                .map_err(|e| validation(&format!("views.tracked[{i}]"), &e.to_string()))?;
        }
        Ok(())
    }

    /// Policy for `schema.entity`, if configured.
    pub fn policy_for(&self, schema: &str, entity: &str) -> Option<&RetentionPolicy> {
        self.partitions
            .iter()
            .find(|p| p.schema == schema && p.entity_type == entity)
    }

    /// Returns the user config path: `~/.keeper/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut KeeperConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: KeeperConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    pub fn merge(base: &mut KeeperConfig, other: &KeeperConfig) {
        // Store
        if other.store.url.is_some() {
            base.store.url = other.store.url.clone();
        }
        if other.store.application_name.is_some() {
            base.store.application_name = other.store.application_name.clone();
        }
        if other.store.connect_timeout_secs.is_some() {
            base.store.connect_timeout_secs = other.store.connect_timeout_secs;
        }
        if other.store.archive_tablespace.is_some() {
            base.store.archive_tablespace = other.store.archive_tablespace.clone();
        }

        // State
        if other.state.path.is_some() {
            base.state.path = other.state.path.clone();
        }
        if other.state.retention_days.is_some() {
            base.state.retention_days = other.state.retention_days;
        }
        if other.state.run_retention_days.is_some() {
            base.state.run_retention_days = other.state.run_retention_days;
        }

        // Bloat
        if other.bloat.threshold_pct.is_some() {
            base.bloat.threshold_pct = other.bloat.threshold_pct;
        }
        if other.bloat.min_size_bytes.is_some() {
            base.bloat.min_size_bytes = other.bloat.min_size_bytes;
        }
        if other.bloat.activity_floor.is_some() {
            base.bloat.activity_floor = other.bloat.activity_floor;
        }
        if other.bloat.btree_fillfactor.is_some() {
            base.bloat.btree_fillfactor = other.bloat.btree_fillfactor;
        }
        if other.bloat.gin_pages_per_row.is_some() {
            base.bloat.gin_pages_per_row = other.bloat.gin_pages_per_row;
        }
        if other.bloat.conservative_fraction.is_some() {
            base.bloat.conservative_fraction = other.bloat.conservative_fraction;
        }
        if other.bloat.rebuild_strategy.is_some() {
            base.bloat.rebuild_strategy = other.bloat.rebuild_strategy;
        }
        if other.bloat.blocking_fallback.is_some() {
            base.bloat.blocking_fallback = other.bloat.blocking_fallback;
        }

        // Views
        if other.views.default_max_staleness_secs.is_some() {
            base.views.default_max_staleness_secs = other.views.default_max_staleness_secs;
        }
        if other.views.track_all.is_some() {
            base.views.track_all = other.views.track_all;
        }
        if !other.views.tracked.is_empty() {
            base.views.tracked = other.views.tracked.clone();
        }

        // Timeouts
        if other.timeouts.lock_timeout_ms.is_some() {
            base.timeouts.lock_timeout_ms = other.timeouts.lock_timeout_ms;
        }
        if other.timeouts.concurrent_max_duration_secs.is_some() {
            base.timeouts.concurrent_max_duration_secs =
                other.timeouts.concurrent_max_duration_secs;
        }
        if other.timeouts.fallback_max_duration_secs.is_some() {
            base.timeouts.fallback_max_duration_secs = other.timeouts.fallback_max_duration_secs;
        }

        // Health
        if other.health.lookahead_periods.is_some() {
            base.health.lookahead_periods = other.health.lookahead_periods;
        }
        if other.health.max_partition_size_bytes.is_some() {
            base.health.max_partition_size_bytes = other.health.max_partition_size_bytes;
        }
        if other.health.max_run_duration_secs.is_some() {
            base.health.max_run_duration_secs = other.health.max_run_duration_secs;
        }
        if other.health.lock_wait_alert_secs.is_some() {
            base.health.lock_wait_alert_secs = other.health.lock_wait_alert_secs;
        }
        if other.health.alert_cooldown_secs.is_some() {
            base.health.alert_cooldown_secs = other.health.alert_cooldown_secs;
        }

        // Partitions
        if !other.partitions.is_empty() {
            base.partitions = other.partitions.clone();
        }
    }

    /// Apply environment overrides read through `lookup`.
    /// Pattern: `KEEPER_STORE_URL`, `KEEPER_BLOAT_THRESHOLD_PCT`, etc.
    pub fn apply_env_overrides<F>(config: &mut KeeperConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("KEEPER_STORE_URL") {
            config.store.url = Some(val);
        }
        if let Some(val) = lookup("KEEPER_STATE_PATH") {
            config.state.path = Some(val);
        }
        if let Some(val) = lookup("KEEPER_ARCHIVE_TABLESPACE") {
            config.store.archive_tablespace = Some(val);
        }
        if let Some(v) = lookup("KEEPER_BLOAT_THRESHOLD_PCT").and_then(|s| s.parse().ok()) {
            config.bloat.threshold_pct = Some(v);
        }
        if let Some(v) = lookup("KEEPER_BLOAT_MIN_SIZE_BYTES").and_then(|s| s.parse().ok()) {
            config.bloat.min_size_bytes = Some(v);
        }
        if let Some(v) = lookup("KEEPER_BLOAT_ACTIVITY_FLOOR").and_then(|s| s.parse().ok()) {
            config.bloat.activity_floor = Some(v);
        }
        if let Some(v) = lookup("KEEPER_LOCK_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            config.timeouts.lock_timeout_ms = Some(v);
        }
        if let Some(v) = lookup("KEEPER_FALLBACK_MAX_DURATION_SECS").and_then(|s| s.parse().ok()) {
            config.timeouts.fallback_max_duration_secs = Some(v);
        }
        if let Some(v) = lookup("KEEPER_ALERT_COOLDOWN_SECS").and_then(|s| s.parse().ok()) {
            config.health.alert_cooldown_secs = Some(v);
        }
    }

    /// Apply CLI overrides (highest priority).
    pub fn apply_cli_overrides(config: &mut KeeperConfig, cli: &CliOverrides) {
        if let Some(ref v) = cli.store_url {
            config.store.url = Some(v.clone());
        }
        if let Some(ref v) = cli.state_path {
            config.state.path = Some(v.clone());
        }
        if let Some(v) = cli.bloat_threshold_pct {
            config.bloat.threshold_pct = Some(v);
        }
        if let Some(v) = cli.lock_timeout_ms {
            config.timeouts.lock_timeout_ms = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn validation(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Returns the user-level keeper config directory: `~/.keeper/`.
fn dirs_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".keeper"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
