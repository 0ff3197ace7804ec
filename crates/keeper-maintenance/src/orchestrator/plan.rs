//! The INITIATED state: validate policies, match them to catalog entities,
//! take entity locks.

use std::collections::HashSet;

use keeper_core::errors::{MaintenanceError, PolicyError};
use keeper_core::models::{FailureDetail, FailureKind, Phase, RetentionPolicy, TargetDescriptor};
use keeper_core::KeeperConfig;

use super::lock::EntityLockGuard;
use crate::collaborators::Collaborators;
use crate::report::classify_catalog;

/// One catalog entity with its policy. `lock` is `None` when another run
/// holds the entity.
pub struct EntityPlan<'a> {
    pub entity: TargetDescriptor,
    pub policy: RetentionPolicy,
    pub lock: Option<EntityLockGuard<'a>>,
}

impl EntityPlan<'_> {
    pub fn is_held(&self) -> bool {
        self.lock.is_some()
    }
}

pub struct RunPlan<'a> {
    pub entities: Vec<EntityPlan<'a>>,
    /// Configured policies whose entity is absent from the catalog.
    pub unmatched: Vec<RetentionPolicy>,
    /// Qualified names of tables owned by entities locked elsewhere.
    pub foreign_tables: HashSet<String>,
    /// Non-fatal catalog failures met while planning.
    pub failures: Vec<FailureDetail>,
}

impl<'a> RunPlan<'a> {
    /// Fails when a policy is invalid or duplicated, when a catalog entity
    /// has no policy, or when the connection is lost. Any other catalog
    /// failure while listing entities leaves the plan empty with a transient
    /// failure, so entity work waits for the next run.
    pub fn build(deps: Collaborators<'a>, config: &KeeperConfig) -> Result<Self, MaintenanceError> {
        let mut seen = HashSet::new();
        for policy in &config.partitions {
            policy.validate()?;
            if !seen.insert(policy.qualified_entity()) {
                return Err(PolicyError::Duplicate {
                    entity: policy.qualified_entity(),
                }
                .into());
            }
        }

        let mut failures = Vec::new();
        let mut catalog_entities = match deps.catalog.partitioned_entities() {
            Ok(found) => found,
            Err(err) => {
                let mut detail = classify_catalog(Phase::Initiated, "partitioned_entities", err)?;
                detail.kind = FailureKind::Transient;
                tracing::warn!(
                    error = %detail.message,
                    "partitioned entities unavailable, entity work deferred"
                );
                return Ok(Self {
                    entities: Vec::new(),
                    unmatched: Vec::new(),
                    foreign_tables: HashSet::new(),
                    failures: vec![detail],
                });
            }
        };
        catalog_entities.sort_by_key(|e| e.qualified_name());

        let mut entities = Vec::new();
        let mut foreign_tables = HashSet::new();
        for entity in catalog_entities {
            let policy = config
                .policy_for(entity.schema().as_str(), entity.name().as_str())
                .cloned()
                .ok_or_else(|| PolicyError::MissingPolicy {
                    entity: entity.qualified_name(),
                })?;

            let lock = match EntityLockGuard::try_acquire(deps.backend, &entity) {
                Ok(lock) => lock,
                Err(err) if err.is_connection_loss() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(entity = %entity, error = %err, "entity lock attempt failed");
                    None
                }
            };
            if lock.is_none() {
                foreign_tables.insert(entity.qualified_name());
                match deps.catalog.list_partitions(&entity) {
                    Ok(partitions) => {
                        for partition in partitions {
                            foreign_tables.insert(partition.target.qualified_name());
                        }
                    }
                    Err(err) => failures.push(classify_catalog(
                        Phase::Initiated,
                        &entity.qualified_name(),
                        err,
                    )?),
                }
            }
            entities.push(EntityPlan {
                entity,
                policy,
                lock,
            });
        }

        let matched: HashSet<String> = entities
            .iter()
            .map(|plan| plan.entity.qualified_name())
            .collect();
        let unmatched = config
            .partitions
            .iter()
            .filter(|policy| !matched.contains(&policy.qualified_entity()))
            .cloned()
            .collect();

        Ok(Self {
            entities,
            unmatched,
            foreign_tables,
            failures,
        })
    }

    pub fn held(&self) -> impl Iterator<Item = &EntityPlan<'a>> {
        self.entities.iter().filter(|plan| plan.is_held())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &EntityPlan<'a>> {
        self.entities.iter().filter(|plan| !plan.is_held())
    }
}
