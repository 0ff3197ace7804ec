//! File-backed state database: WAL mode, migrations, reopen.

use chrono::Utc;
use keeper_core::models::{MaintenanceRunRecord, MaintenanceTier};
use keeper_core::traits::StateStore;
use keeper_storage::connection::pragmas::verify_wal_mode;
use keeper_storage::migrations::{current_version, LATEST_VERSION};
use keeper_storage::SqliteStateStore;

#[test]
fn reopening_preserves_records_and_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("keeper.db");

    let record = MaintenanceRunRecord::begin(MaintenanceTier::Daily, Utc::now());
    {
        let store = SqliteStateStore::open(&path).unwrap();
        store.insert_run(&record).unwrap();
    }

    let store = SqliteStateStore::open(&path).unwrap();
    let version = store.database().with_writer(current_version).unwrap();
    assert_eq!(version, LATEST_VERSION);
    assert!(store.database().with_writer(verify_wal_mode).unwrap());

    let running = store.running_runs().unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].run_id, record.run_id);
}
