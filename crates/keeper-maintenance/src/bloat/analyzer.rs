//! Turns raw index statistics into health records.

use std::collections::HashMap;

use keeper_core::config::BloatConfig;
use keeper_core::models::{bloat_pct, AccessMethod, IndexHealthRecord, IndexStats};
use keeper_core::tracing::events;

use super::heuristics::{BloatHeuristic, BtreeHeuristic, ConservativeHeuristic, GinHeuristic};

/// Computes bloat per index and decides which indexes to flag.
///
/// An index is flagged when its bloat exceeds the threshold, its size exceeds
/// the minimum, and its scan count exceeds the activity floor. Indexes that
/// are invalid, too small or too idle are not candidates at all.
pub struct IndexBloatAnalyzer {
    threshold_pct: f64,
    min_size_bytes: u64,
    activity_floor: u64,
    heuristics: HashMap<AccessMethod, Box<dyn BloatHeuristic>>,
    fallback: Box<dyn BloatHeuristic>,
}

impl IndexBloatAnalyzer {
    pub fn new(config: &BloatConfig) -> Self {
        let mut heuristics: HashMap<AccessMethod, Box<dyn BloatHeuristic>> = HashMap::new();
        heuristics.insert(
            AccessMethod::Btree,
            Box::new(BtreeHeuristic {
                fillfactor: config.effective_btree_fillfactor(),
            }),
        );
        heuristics.insert(
            AccessMethod::Gin,
            Box::new(GinHeuristic {
                pages_per_row: config.effective_gin_pages_per_row(),
            }),
        );
        Self {
            threshold_pct: config.effective_threshold_pct(),
            min_size_bytes: config.effective_min_size_bytes(),
            activity_floor: config.effective_activity_floor(),
            heuristics,
            fallback: Box::new(ConservativeHeuristic {
                fraction: config.effective_conservative_fraction(),
            }),
        }
    }

    /// Replace or add the heuristic used for one access method.
    pub fn with_heuristic(
        mut self,
        method: AccessMethod,
        heuristic: Box<dyn BloatHeuristic>,
    ) -> Self {
        self.heuristics.insert(method, heuristic);
        self
    }

    fn heuristic_for(&self, method: &AccessMethod) -> &dyn BloatHeuristic {
        self.heuristics
            .get(method)
            .map(|h| h.as_ref())
            .unwrap_or_else(|| self.fallback.as_ref())
    }

    /// Health record of one index, whatever its size or activity.
    pub fn evaluate(&self, stats: &IndexStats) -> IndexHealthRecord {
        let ideal = self.heuristic_for(&stats.access_method).estimate_ideal_size(stats);
        let pct = bloat_pct(stats.size_bytes, ideal);
        let flagged = stats.valid
            && pct > self.threshold_pct
            && stats.size_bytes > self.min_size_bytes
            && stats.scan_count > self.activity_floor;
        IndexHealthRecord {
            index: stats.index.clone(),
            table: stats.table.clone(),
            access_method: stats.access_method.clone(),
            current_size_bytes: stats.size_bytes,
            estimated_ideal_size_bytes: ideal,
            bloat_pct: pct,
            scan_count: stats.scan_count,
            constraint_backing: stats.constraint_backing,
            flagged,
        }
    }

    /// Records for valid indexes above the size minimum and activity floor,
    /// most bloated first.
    pub fn analyze(&self, stats: &[IndexStats]) -> Vec<IndexHealthRecord> {
        let mut records: Vec<IndexHealthRecord> = stats
            .iter()
            .filter(|s| {
                s.valid && s.size_bytes > self.min_size_bytes && s.scan_count > self.activity_floor
            })
            .map(|s| self.evaluate(s))
            .collect();
        sort_by_bloat(&mut records);
        for record in records.iter().filter(|r| r.flagged) {
            events::index_flagged(&record.index_name(), record.bloat_pct, record.current_size_bytes);
        }
        records
    }

    /// Only the flagged records of [`analyze`](Self::analyze).
    pub fn candidates(&self, stats: &[IndexStats]) -> Vec<IndexHealthRecord> {
        self.analyze(stats).into_iter().filter(|r| r.flagged).collect()
    }

    /// Records for every valid index, flagged or not. Read-only view.
    pub fn health_view(&self, stats: &[IndexStats]) -> Vec<IndexHealthRecord> {
        let mut records: Vec<IndexHealthRecord> = stats
            .iter()
            .filter(|s| s.valid)
            .map(|s| self.evaluate(s))
            .collect();
        sort_by_bloat(&mut records);
        records
    }
}

fn sort_by_bloat(records: &mut [IndexHealthRecord]) {
    records.sort_by(|a, b| {
        b.bloat_pct
            .partial_cmp(&a.bloat_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.index_name().cmp(&b.index_name()))
    });
}
