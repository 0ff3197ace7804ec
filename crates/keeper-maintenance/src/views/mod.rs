//! Materialized view refresh.

pub mod refresher;

pub use refresher::{MaterializedViewRefresher, RefreshOutcome};
