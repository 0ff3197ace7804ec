//! Command implementations and the shared context they run in.

pub mod health;
pub mod history;
pub mod run;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use keeper_core::config::CliOverrides;
use keeper_core::errors::CatalogError;
use keeper_core::KeeperConfig;
use keeper_postgres::PgStore;
use keeper_storage::SqliteStateStore;

/// Resolved configuration plus the project root it was loaded from.
pub struct Context {
    pub root: PathBuf,
    pub config: KeeperConfig,
}

impl Context {
    pub fn load(root: PathBuf, overrides: &CliOverrides) -> Result<Self> {
        let config = KeeperConfig::load(&root, Some(overrides))
            .with_context(|| format!("failed to load configuration from {}", root.display()))?;
        Ok(Self { root, config })
    }

    pub fn open_state(&self) -> Result<SqliteStateStore> {
        let path = self.config.state.effective_path(&self.root);
        SqliteStateStore::open(&path)
            .with_context(|| format!("failed to open state database {}", path.display()))
    }

    /// The raw error is returned so scheduled commands can record it.
    pub fn connect_store(&self) -> Result<PgStore, CatalogError> {
        PgStore::connect(&self.config.store)
    }
}
