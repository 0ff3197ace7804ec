//! [`PgStore`]: one connection, one private runtime, every seam.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio_postgres::{Client, NoTls};

use keeper_core::config::StoreConfig;
use keeper_core::errors::{ActionError, CatalogError};
use keeper_core::models::{
    Ident, IndexStats, LockChain, PartitionDescriptor, PeriodRange, RelationKind, SessionSettings,
    TargetDescriptor, ViewMetadata,
};
use keeper_core::traits::{
    ActionMode, ArchiveReceipt, ArchiveTier, CatalogReader, MaintenanceBackend,
};

use crate::catalog;
use crate::ddl;
use crate::session::{self, PreviousSettings};
use crate::sqlstate::{self, ActionContext};

/// PostgreSQL implementation of the catalog, backend and archive seams.
///
/// Calls are synchronous; each blocks on the private runtime. Session
/// settings are per connection, so actions are serialized.
pub struct PgStore {
    runtime: Runtime,
    client: Client,
    archive_tablespace: Option<Ident>,
    action_lock: Mutex<()>,
}

impl PgStore {
    /// Connect using `config`. Must be called outside an async runtime.
    pub fn connect(config: &StoreConfig) -> Result<Self, CatalogError> {
        if Handle::try_current().is_ok() {
            return Err(CatalogError::QueryFailed {
                message: "PgStore must be created outside an async runtime".to_string(),
            });
        }
        let url = config.url.as_deref().ok_or_else(|| CatalogError::QueryFailed {
            message: "store.url is not configured".to_string(),
        })?;
        let archive_tablespace = config
            .archive_tablespace
            .as_deref()
            .map(Ident::new)
            .transpose()?;

        let mut pg_config: tokio_postgres::Config =
            url.parse().map_err(|e: tokio_postgres::Error| CatalogError::QueryFailed {
                message: format!("invalid store url: {e}"),
            })?;
        pg_config
            .application_name(&config.effective_application_name())
            .connect_timeout(Duration::from_secs(config.effective_connect_timeout_secs()));

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::QueryFailed {
                message: format!("failed to create runtime for the store connection: {e}"),
            })?;

        let (client, connection) = runtime
            .block_on(pg_config.connect(NoTls))
            .map_err(|e| CatalogError::ConnectionLost {
                message: format!("connection failed: {e}"),
            })?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "store connection closed");
            }
        });
        tracing::info!(
            event = "store_connected",
            application_name = %config.effective_application_name(),
            "connected to store"
        );

        Ok(Self {
            runtime,
            client,
            archive_tablespace,
            action_lock: Mutex::new(()),
        })
    }

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, CatalogError> {
        self.runtime
            .block_on(self.client.query(sql, params))
            .map_err(|e| sqlstate::catalog_error(&e))
    }

    fn decode<T>(
        rows: Vec<tokio_postgres::Row>,
        decode: impl Fn(&tokio_postgres::Row) -> Result<Option<T>, tokio_postgres::Error>,
    ) -> Result<Vec<T>, CatalogError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(value) = decode(row).map_err(|e| sqlstate::catalog_error(&e))? {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Run `statements` in order under `settings`, then restore the previous
    /// session values. The restore runs even when a statement fails.
    fn execute(
        &self,
        target: &TargetDescriptor,
        settings: &SessionSettings,
        statements: &[String],
    ) -> Result<(), ActionError> {
        let _serialized = self
            .action_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let name = target.qualified_name();
        let ctx = ActionContext {
            target: &name,
            settings,
        };

        self.runtime.block_on(async {
            let captured = self
                .client
                .query_one(session::CAPTURE_SQL, &[])
                .await
                .map_err(|e| sqlstate::action_error(&e, &ctx))?;
            let previous = PreviousSettings {
                lock_timeout: captured.try_get(0).map_err(|e| sqlstate::action_error(&e, &ctx))?,
                statement_timeout: captured
                    .try_get(1)
                    .map_err(|e| sqlstate::action_error(&e, &ctx))?,
            };
            self.client
                .batch_execute(&session::apply_sql(settings))
                .await
                .map_err(|e| sqlstate::action_error(&e, &ctx))?;

            let mut result = Ok(());
            for statement in statements {
                tracing::debug!(target_object = %name, sql = %statement, "executing");
                if let Err(e) = self.client.batch_execute(statement).await {
                    result = Err(sqlstate::action_error(&e, &ctx));
                    break;
                }
            }

            if let Err(e) = self
                .client
                .batch_execute(&session::restore_sql(&previous))
                .await
            {
                let restore = sqlstate::action_error(&e, &ctx);
                tracing::warn!(target_object = %name, error = %restore, "session settings not restored");
                if result.is_ok() || restore.is_connection_loss() {
                    result = Err(restore);
                }
            }
            result
        })
    }

    fn index_definition(&self, index: &TargetDescriptor) -> Result<Option<String>, CatalogError> {
        let rows = self.query(
            catalog::INDEX_DEFINITION_SQL,
            &[&index.schema().as_str(), &index.name().as_str()],
        )?;
        match rows.first() {
            Some(row) => row.try_get(0).map(Some).map_err(|e| sqlstate::catalog_error(&e)),
            None => Ok(None),
        }
    }
}

fn catalog_to_action(target: &TargetDescriptor, err: CatalogError) -> ActionError {
    match err {
        CatalogError::ConnectionLost { message } => ActionError::ConnectionLost { message },
        other => ActionError::Failed {
            target: target.qualified_name(),
            message: other.to_string(),
        },
    }
}

/// Failure after the replacement index was built. Connection loss stays
/// fatal; anything else becomes [`ActionError::Incomplete`].
fn swap_failure(
    index: &TargetDescriptor,
    replacement: &TargetDescriptor,
    step: &str,
    err: ActionError,
) -> ActionError {
    if err.is_connection_loss() {
        return err;
    }
    tracing::error!(
        event = "index_swap_incomplete",
        index = %index.qualified_name(),
        replacement = %replacement.qualified_name(),
        step,
        error = %err,
        "index replacement interrupted"
    );
    ActionError::Incomplete {
        target: index.qualified_name(),
        step: step.to_string(),
        replacement: replacement.qualified_name(),
        message: err.to_string(),
    }
}

impl CatalogReader for PgStore {
    fn ping(&self) -> Result<(), CatalogError> {
        self.query(catalog::PING_SQL, &[]).map(|_| ())
    }

    fn partitioned_entities(&self) -> Result<Vec<TargetDescriptor>, CatalogError> {
        let rows = self.query(&catalog::partitioned_entities_sql(), &[])?;
        Self::decode(rows, catalog::entity_row)
    }

    fn list_partitions(
        &self,
        entity: &TargetDescriptor,
    ) -> Result<Vec<PartitionDescriptor>, CatalogError> {
        let params: [&(dyn tokio_postgres::types::ToSql + Sync); 2] =
            [&entity.schema().as_str(), &entity.name().as_str()];
        if self.query(catalog::ENTITY_EXISTS_SQL, &params)?.is_empty() {
            return Err(CatalogError::UnresolvedTarget {
                kind: RelationKind::PartitionedTable.as_str().to_string(),
                name: entity.qualified_name(),
            });
        }
        let rows = self.query(catalog::LIST_PARTITIONS_SQL, &params)?;
        let archive = self.archive_tablespace.as_ref().map(Ident::as_str);
        Self::decode(rows, |row| catalog::partition_row(row, entity, archive))
    }

    fn index_stats(&self) -> Result<Vec<IndexStats>, CatalogError> {
        let rows = self.query(catalog::INDEX_STATS_SQL, &[])?;
        Self::decode(rows, catalog::index_stats_row)
    }

    fn invalid_indexes(&self) -> Result<Vec<TargetDescriptor>, CatalogError> {
        let rows = self.query(&catalog::invalid_indexes_sql(), &[])?;
        Self::decode(rows, catalog::index_target_row)
    }

    fn materialized_views(&self) -> Result<Vec<ViewMetadata>, CatalogError> {
        let rows = self.query(catalog::MATERIALIZED_VIEWS_SQL, &[])?;
        Self::decode(rows, catalog::view_row)
    }

    fn blocking_lock_chains(&self) -> Result<Vec<LockChain>, CatalogError> {
        let rows = self.query(catalog::LOCK_CHAINS_SQL, &[])?;
        Self::decode(rows, |row| catalog::lock_chain_row(row).map(Some))
    }
}

impl MaintenanceBackend for PgStore {
    fn create_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        range: &PeriodRange,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(
            partition,
            settings,
            &[ddl::create_partition(parent, partition, range)],
        )
    }

    fn drop_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(
            partition,
            settings,
            &[
                ddl::detach_partition(parent, partition),
                ddl::drop_table(partition),
            ],
        )
    }

    fn rebuild_index(
        &self,
        index: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(index, settings, &[ddl::reindex(index, mode)])
    }

    fn recreate_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        let definition = self
            .index_definition(index)
            .map_err(|e| catalog_to_action(index, e))?
            .ok_or_else(|| ActionError::Failed {
                target: index.qualified_name(),
                message: "index not found".to_string(),
            })?;
        let replacement = ddl::replacement_index(index).map_err(|e| catalog_to_action(index, e))?;
        let build = ddl::replacement_definition(&definition, &replacement).ok_or_else(|| {
            ActionError::Unsupported {
                target: index.qualified_name(),
                reason: "index definition cannot be rebuilt under a new name".to_string(),
            }
        })?;
        self.execute(index, settings, &[ddl::drop_index(&replacement), build])?;

        // The replacement exists from here on; a failure must not fall back
        // to reindexing a name that may already be gone.
        self.execute(index, settings, &[ddl::drop_index(index)])
            .map_err(|e| swap_failure(index, &replacement, "drop of the original index", e))?;
        self.execute(index, settings, &[ddl::rename_index(&replacement, index.name())])
            .map_err(|e| swap_failure(index, &replacement, "rename of the replacement", e))
    }

    fn drop_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(index, settings, &[ddl::drop_index(index)])
    }

    fn refresh_view(
        &self,
        view: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(view, settings, &[ddl::refresh_view(view, mode)])
    }

    fn analyze(
        &self,
        table: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(table, settings, &[ddl::analyze(table)])
    }

    fn vacuum(
        &self,
        table: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.execute(table, settings, &[ddl::vacuum(table)])
    }

    fn try_lock_entity(&self, key: &str) -> Result<bool, ActionError> {
        let row = self
            .runtime
            .block_on(self.client.query_one(catalog::TRY_LOCK_SQL, &[&key]))
            .map_err(|e| lock_error(key, &e))?;
        row.try_get(0).map_err(|e| lock_error(key, &e))
    }

    fn unlock_entity(&self, key: &str) -> Result<(), ActionError> {
        self.runtime
            .block_on(self.client.query_one(catalog::UNLOCK_SQL, &[&key]))
            .map(|_| ())
            .map_err(|e| lock_error(key, &e))
    }
}

fn lock_error(key: &str, err: &tokio_postgres::Error) -> ActionError {
    match sqlstate::catalog_error(err) {
        CatalogError::ConnectionLost { message } => ActionError::ConnectionLost { message },
        other => ActionError::Failed {
            target: key.to_string(),
            message: other.to_string(),
        },
    }
}

impl ArchiveTier for PgStore {
    /// Move the partition to the configured archive tablespace.
    fn archive(
        &self,
        partition: &PartitionDescriptor,
        settings: &SessionSettings,
    ) -> Result<ArchiveReceipt, ActionError> {
        let tablespace =
            self.archive_tablespace
                .as_ref()
                .ok_or_else(|| ActionError::Unsupported {
                    target: partition.target.qualified_name(),
                    reason: "store.archive_tablespace is not configured".to_string(),
                })?;
        self.execute(
            &partition.target,
            settings,
            &[ddl::set_tablespace(&partition.target, tablespace)],
        )?;
        Ok(ArchiveReceipt {
            partition: partition.target.qualified_name(),
            destination: tablespace.as_str().to_string(),
            archived_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(name: &str) -> TargetDescriptor {
        TargetDescriptor::resolve("public", name, RelationKind::Index).unwrap()
    }

    #[test]
    fn swap_failure_never_allows_fallback() {
        let original = index("events_tenant_idx");
        let replacement = index("events_tenant_idx_kr");
        let err = swap_failure(
            &original,
            &replacement,
            "rename of the replacement",
            ActionError::Failed {
                target: original.qualified_name(),
                message: "relation \"events_tenant_idx\" already exists".into(),
            },
        );

        assert!(!err.allows_fallback());
        assert!(!err.is_transient());
        match err {
            ActionError::Incomplete {
                replacement, step, ..
            } => {
                assert_eq!(replacement, "public.events_tenant_idx_kr");
                assert_eq!(step, "rename of the replacement");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn swap_failure_keeps_connection_loss_fatal() {
        let err = swap_failure(
            &index("events_tenant_idx"),
            &index("events_tenant_idx_kr"),
            "drop of the original index",
            ActionError::ConnectionLost {
                message: "server closed the connection unexpectedly".into(),
            },
        );
        assert!(err.is_connection_loss());
    }
}
