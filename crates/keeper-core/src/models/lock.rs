//! Lock-contention chains observed in the store.

use serde::{Deserialize, Serialize};

/// One blocked session and the session blocking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockChain {
    pub blocked_pid: i32,
    pub blocking_pid: i32,
    pub relation: Option<String>,
    pub wait_secs: f64,
    pub blocked_query: String,
}
