//! Test support for keeper crates: JSON catalog fixtures, a simulated store
//! with fault injection, and a controllable clock.

pub mod clock;
pub mod simulated;
pub mod snapshot;
pub mod state_faults;

use std::path::PathBuf;

use serde::de::DeserializeOwned;

pub use clock::TestClock;
pub use simulated::{ActionRecord, Op, SimulatedStore};
pub use snapshot::CatalogSnapshot;
pub use state_faults::FaultyStateStore;

/// Root directory of the test-fixtures folder.
fn fixtures_root() -> PathBuf {
    // Walk up from whichever crate is running the test.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);

    while !path.join("test-fixtures").exists() {
        if !path.pop() {
            panic!(
                "Could not find test-fixtures directory from CARGO_MANIFEST_DIR={}",
                manifest_dir
            );
        }
    }
    path.join("test-fixtures")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Absolute path to a fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

/// Build a simulated store from a catalog snapshot fixture.
pub fn load_catalog(relative_path: &str) -> SimulatedStore {
    SimulatedStore::from_snapshot(&load_fixture::<CatalogSnapshot>(relative_path))
}
