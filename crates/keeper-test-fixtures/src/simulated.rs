//! In-memory store implementing the catalog, backend and archive seams,
//! with per-operation fault injection and an action log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use keeper_core::errors::{ActionError, CatalogError};
use keeper_core::models::{
    IndexStats, LockChain, MonthPeriod, PartitionDescriptor, PeriodRange, RelationKind,
    SessionSettings, TargetDescriptor, ViewMetadata,
};
use keeper_core::traits::{
    ActionMode, ArchiveReceipt, ArchiveTier, CatalogReader, MaintenanceBackend,
};

use crate::snapshot::CatalogSnapshot;

/// Operations faults can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreatePartition,
    DropPartition,
    Archive,
    RebuildIndex(ActionMode),
    RecreateIndex,
    DropIndex,
    RefreshView(ActionMode),
    Analyze,
    Vacuum,
}

/// One executed (or attempted) action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub op: Op,
    pub target: String,
    pub settings: Option<SessionSettings>,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct Entity {
    target: Option<TargetDescriptor>,
    partitions: Vec<PartitionDescriptor>,
}

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<String, Entity>,
    indexes: Vec<IndexStats>,
    invalid_indexes: Vec<TargetDescriptor>,
    views: Vec<ViewMetadata>,
    lock_chains: Vec<LockChain>,
    /// Advisory locks taken through this store.
    held_locks: HashSet<String>,
    /// Advisory locks held by some other session.
    foreign_locks: HashSet<String>,
    action_faults: HashMap<(Op, String), ActionError>,
    catalog_fault: Option<CatalogError>,
    /// Faults on listing the partitions of one entity.
    listing_faults: HashMap<String, CatalogError>,
    connection_lost: bool,
    actions: Vec<ActionRecord>,
}

/// A simulated store. Interior mutability lets it be shared behind `&`.
#[derive(Debug, Default)]
pub struct SimulatedStore {
    state: Mutex<State>,
}

impl SimulatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        let store = Self::new();
        for entity in &snapshot.entities {
            let parent = store.add_entity(&entity.schema, &entity.name);
            for p in &entity.partitions {
                let period = parse_period(&p.period);
                store.add_partition(&parent, &partition_name(&entity.name, &period), period.range(), p.size_bytes, p.archived);
            }
        }
        {
            let mut state = store.state.lock().unwrap();
            state.indexes = snapshot.indexes.clone();
            state.invalid_indexes = snapshot.invalid_indexes.clone();
            state.views = snapshot.views.clone();
            state.lock_chains = snapshot.lock_chains.clone();
        }
        store
    }

    // ---- Catalog setup ----

    pub fn add_entity(&self, schema: &str, name: &str) -> TargetDescriptor {
        let target = TargetDescriptor::resolve(schema, name, RelationKind::PartitionedTable)
            .expect("valid entity name");
        let mut state = self.state.lock().unwrap();
        state
            .entities
            .entry(target.qualified_name())
            .or_default()
            .target = Some(target.clone());
        target
    }

    /// Attach a partition with an arbitrary range.
    pub fn add_partition(
        &self,
        parent: &TargetDescriptor,
        name: &str,
        range: PeriodRange,
        size_bytes: u64,
        archived: bool,
    ) {
        let target = TargetDescriptor::resolve(parent.schema().as_str(), name, RelationKind::Partition)
            .expect("valid partition name");
        let mut state = self.state.lock().unwrap();
        let entity = state.entities.entry(parent.qualified_name()).or_default();
        entity.partitions.push(PartitionDescriptor {
            target,
            entity: parent.name().as_str().to_string(),
            range,
            created_at: None,
            size_bytes,
            archived,
        });
    }

    /// Add a monthly partition named `{entity}_p{YYYY}_{MM}`.
    pub fn add_month(&self, parent: &TargetDescriptor, year: i32, month: u32, size_bytes: u64) {
        let period = MonthPeriod::new(year, month).expect("valid month");
        self.add_partition(
            parent,
            &partition_name(parent.name().as_str(), &period),
            period.range(),
            size_bytes,
            false,
        );
    }

    pub fn add_index(&self, stats: IndexStats) {
        self.state.lock().unwrap().indexes.push(stats);
    }

    pub fn add_invalid_index(&self, index: TargetDescriptor) {
        self.state.lock().unwrap().invalid_indexes.push(index);
    }

    pub fn add_view(&self, view: ViewMetadata) {
        self.state.lock().unwrap().views.push(view);
    }

    pub fn add_lock_chain(&self, chain: LockChain) {
        self.state.lock().unwrap().lock_chains.push(chain);
    }

    // ---- Fault injection ----

    /// Every `op` on `target` (qualified name) fails with `error`.
    pub fn fail_action(&self, op: Op, target: &str, error: ActionError) {
        self.state
            .lock()
            .unwrap()
            .action_faults
            .insert((op, target.to_string()), error);
    }

    pub fn clear_fault(&self, op: Op, target: &str) {
        self.state
            .lock()
            .unwrap()
            .action_faults
            .remove(&(op, target.to_string()));
    }

    /// Every catalog read fails with `error`.
    pub fn fail_catalog(&self, error: CatalogError) {
        self.state.lock().unwrap().catalog_fault = Some(error);
    }

    /// Listing the partitions of `entity` (qualified name) fails with `error`.
    pub fn fail_partition_listing(&self, entity: &str, error: CatalogError) {
        self.state
            .lock()
            .unwrap()
            .listing_faults
            .insert(entity.to_string(), error);
    }

    /// All later catalog reads and actions fail with connection loss.
    pub fn lose_connection(&self) {
        self.state.lock().unwrap().connection_lost = true;
    }

    /// Simulate another session holding the advisory lock `key`.
    pub fn hold_foreign_lock(&self, key: &str) {
        self.state.lock().unwrap().foreign_locks.insert(key.to_string());
    }

    // ---- Inspection ----

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn actions_of(&self, op: Op) -> Vec<ActionRecord> {
        self.actions().into_iter().filter(|a| a.op == op).collect()
    }

    /// Partition names of `entity` (qualified), sorted by range start.
    pub fn partition_names(&self, entity: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut partitions: Vec<_> = state
            .entities
            .get(entity)
            .map(|e| e.partitions.iter().collect())
            .unwrap_or_default();
        partitions.sort_by_key(|p| p.range.start);
        partitions
            .into_iter()
            .map(|p| p.table_name().to_string())
            .collect()
    }

    pub fn held_locks(&self) -> Vec<String> {
        let mut locks: Vec<_> = self.state.lock().unwrap().held_locks.iter().cloned().collect();
        locks.sort();
        locks
    }

    pub fn invalid_index_count(&self) -> usize {
        self.state.lock().unwrap().invalid_indexes.len()
    }

    // ---- Internals ----

    fn check_catalog(state: &State) -> Result<(), CatalogError> {
        if state.connection_lost {
            return Err(CatalogError::ConnectionLost {
                message: "server closed the connection unexpectedly".to_string(),
            });
        }
        match &state.catalog_fault {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Apply faults and log the attempt. On success `apply` mutates state.
    fn act<F>(
        &self,
        op: Op,
        target: &TargetDescriptor,
        settings: Option<&SessionSettings>,
        apply: F,
    ) -> Result<(), ActionError>
    where
        F: FnOnce(&mut State) -> Result<(), ActionError>,
    {
        let mut state = self.state.lock().unwrap();
        let name = target.qualified_name();
        let result = if state.connection_lost {
            Err(ActionError::ConnectionLost {
                message: "server closed the connection unexpectedly".to_string(),
            })
        } else if let Some(err) = state.action_faults.get(&(op, name.clone())).cloned() {
            if err.is_connection_loss() {
                state.connection_lost = true;
            }
            Err(err)
        } else {
            apply(&mut *state)
        };
        state.actions.push(ActionRecord {
            op,
            target: name,
            settings: settings.copied(),
            succeeded: result.is_ok(),
        });
        result
    }
}

fn partition_name(entity: &str, period: &MonthPeriod) -> String {
    format!("{}_p{}", entity, period.suffix())
}

fn parse_period(value: &str) -> MonthPeriod {
    let (year, month) = value.split_once('-').expect("period formatted as YYYY-MM");
    MonthPeriod::new(year.parse().expect("year"), month.parse().expect("month"))
        .expect("valid month")
}

impl CatalogReader for SimulatedStore {
    fn ping(&self) -> Result<(), CatalogError> {
        Self::check_catalog(&self.state.lock().unwrap())
    }

    fn partitioned_entities(&self) -> Result<Vec<TargetDescriptor>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        Ok(state
            .entities
            .values()
            .filter_map(|e| e.target.clone())
            .collect())
    }

    fn list_partitions(
        &self,
        entity: &TargetDescriptor,
    ) -> Result<Vec<PartitionDescriptor>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        if let Some(err) = state.listing_faults.get(&entity.qualified_name()) {
            return Err(err.clone());
        }
        state
            .entities
            .get(&entity.qualified_name())
            .map(|e| e.partitions.clone())
            .ok_or_else(|| CatalogError::UnresolvedTarget {
                kind: "partitioned_table".to_string(),
                name: entity.qualified_name(),
            })
    }

    fn index_stats(&self) -> Result<Vec<IndexStats>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        Ok(state.indexes.clone())
    }

    fn invalid_indexes(&self) -> Result<Vec<TargetDescriptor>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        Ok(state.invalid_indexes.clone())
    }

    fn materialized_views(&self) -> Result<Vec<ViewMetadata>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        Ok(state.views.clone())
    }

    fn blocking_lock_chains(&self) -> Result<Vec<LockChain>, CatalogError> {
        let state = self.state.lock().unwrap();
        Self::check_catalog(&state)?;
        Ok(state.lock_chains.clone())
    }
}

impl MaintenanceBackend for SimulatedStore {
    fn create_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        range: &PeriodRange,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::CreatePartition, partition, Some(settings), |state| {
            let entity = state.entities.entry(parent.qualified_name()).or_default();
            if let Some(existing) = entity.partitions.iter().find(|p| p.range.overlaps(range)) {
                return Err(ActionError::Failed {
                    target: partition.qualified_name(),
                    message: format!(
                        "partition would overlap partition \"{}\"",
                        existing.table_name()
                    ),
                });
            }
            entity.partitions.push(PartitionDescriptor {
                target: partition.clone(),
                entity: parent.name().as_str().to_string(),
                range: *range,
                created_at: Some(Utc::now()),
                size_bytes: 0,
                archived: false,
            });
            Ok(())
        })
    }

    fn drop_partition(
        &self,
        parent: &TargetDescriptor,
        partition: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::DropPartition, partition, Some(settings), |state| {
            let entity = state.entities.entry(parent.qualified_name()).or_default();
            let before = entity.partitions.len();
            entity.partitions.retain(|p| &p.target != partition);
            if entity.partitions.len() == before {
                return Err(ActionError::Failed {
                    target: partition.qualified_name(),
                    message: "table does not exist".to_string(),
                });
            }
            Ok(())
        })
    }

    fn rebuild_index(
        &self,
        index: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::RebuildIndex(mode), index, Some(settings), |_| Ok(()))
    }

    fn recreate_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::RecreateIndex, index, Some(settings), |_| Ok(()))
    }

    fn drop_index(
        &self,
        index: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::DropIndex, index, Some(settings), |state| {
            state.invalid_indexes.retain(|i| i != index);
            state.indexes.retain(|i| &i.index != index);
            Ok(())
        })
    }

    fn refresh_view(
        &self,
        view: &TargetDescriptor,
        mode: ActionMode,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::RefreshView(mode), view, Some(settings), |state| {
            if let Some(meta) = state.views.iter_mut().find(|v| &v.target == view) {
                meta.populated = true;
            }
            Ok(())
        })
    }

    fn analyze(
        &self,
        table: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::Analyze, table, Some(settings), |_| Ok(()))
    }

    fn vacuum(
        &self,
        table: &TargetDescriptor,
        settings: &SessionSettings,
    ) -> Result<(), ActionError> {
        self.act(Op::Vacuum, table, Some(settings), |_| Ok(()))
    }

    fn try_lock_entity(&self, key: &str) -> Result<bool, ActionError> {
        let mut state = self.state.lock().unwrap();
        if state.connection_lost {
            return Err(ActionError::ConnectionLost {
                message: "server closed the connection unexpectedly".to_string(),
            });
        }
        if state.foreign_locks.contains(key) || state.held_locks.contains(key) {
            return Ok(false);
        }
        state.held_locks.insert(key.to_string());
        Ok(true)
    }

    fn unlock_entity(&self, key: &str) -> Result<(), ActionError> {
        self.state.lock().unwrap().held_locks.remove(key);
        Ok(())
    }
}

impl ArchiveTier for SimulatedStore {
    fn archive(
        &self,
        partition: &PartitionDescriptor,
        settings: &SessionSettings,
    ) -> Result<ArchiveReceipt, ActionError> {
        let target = partition.target.clone();
        self.act(Op::Archive, &target, Some(settings), |state| {
            let found = state
                .entities
                .values_mut()
                .flat_map(|e| e.partitions.iter_mut())
                .find(|p| p.target == target);
            match found {
                Some(p) => {
                    p.archived = true;
                    Ok(())
                }
                None => Err(ActionError::Failed {
                    target: target.qualified_name(),
                    message: "relation does not exist".to_string(),
                }),
            }
        })?;
        Ok(ArchiveReceipt {
            partition: partition.target.qualified_name(),
            destination: "archive".to_string(),
            archived_at: Utc::now(),
        })
    }
}
