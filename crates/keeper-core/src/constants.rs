//! Documented fallbacks used when the configuration source leaves a value unset.

/// keeper version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---- Index bloat ----

/// Bloat percentage above which an index is flagged.
pub const DEFAULT_BLOAT_THRESHOLD_PCT: f64 = 25.0;

/// Minimum index size (bytes) considered for remediation: 100 MiB.
pub const DEFAULT_MIN_INDEX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Minimum scan count for an index to be considered active.
pub const DEFAULT_ACTIVITY_FLOOR: u64 = 1000;

/// Default page size of the store, in bytes.
pub const DEFAULT_PAGE_SIZE: u64 = 8192;

/// B-tree leaf fill factor assumed by the ideal-size estimate.
pub const DEFAULT_BTREE_FILLFACTOR: f64 = 0.90;

/// GIN placeholder: pages per indexed row. Not a calibrated model.
pub const DEFAULT_GIN_PAGES_PER_ROW: f64 = 0.01;

/// Ideal size as a fraction of current size for access methods without a heuristic.
pub const DEFAULT_CONSERVATIVE_FRACTION: f64 = 0.80;

// ---- Timeouts ----

/// Bounded lock-acquisition wait for every action: 5 seconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Upper bound for a non-blocking (concurrent) action: 1 hour.
pub const DEFAULT_CONCURRENT_MAX_DURATION_SECS: u64 = 3_600;

/// Upper bound for a blocking fallback: 5 minutes.
pub const DEFAULT_FALLBACK_MAX_DURATION_SECS: u64 = 300;

// ---- Materialized views ----

/// Staleness allowed before a tracked view is refreshed: 6 hours.
pub const DEFAULT_MAX_STALENESS_SECS: u64 = 6 * 3600;

// ---- Health ----

/// Partition size above which an alert is raised: 50 GiB.
pub const DEFAULT_MAX_PARTITION_SIZE_BYTES: u64 = 50 * 1024 * 1024 * 1024;

/// A run still RUNNING after this long is considered stuck: 6 hours.
pub const DEFAULT_MAX_RUN_DURATION_SECS: u64 = 6 * 3600;

/// A blocked session waiting longer than this counts as lock contention.
pub const DEFAULT_LOCK_WAIT_ALERT_SECS: u64 = 30;

/// Identical alerts inside this window are suppressed: 1 hour.
pub const DEFAULT_ALERT_COOLDOWN_SECS: u64 = 3600;

// ---- State database ----

/// Default state database file name.
pub const DEFAULT_STATE_DB: &str = "keeper.db";

/// Days of alerts and index-health snapshots kept in the state database.
pub const DEFAULT_STATE_RETENTION_DAYS: u32 = 90;

/// Days of finished run records kept in the state database.
pub const DEFAULT_RUN_RETENTION_DAYS: u32 = 365;

// ---- Store ----

/// Default application_name reported to the store.
pub const DEFAULT_APPLICATION_NAME: &str = "keeper";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Prefix of the advisory lock key taken per partitioned entity.
pub const ENTITY_LOCK_PREFIX: &str = "keeper:entity:";
