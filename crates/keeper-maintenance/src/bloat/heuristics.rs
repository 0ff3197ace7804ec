//! Ideal-size estimators, one per access method.

use keeper_core::constants::DEFAULT_PAGE_SIZE;
use keeper_core::models::IndexStats;

/// Estimates the size an index would have right after a rebuild.
pub trait BloatHeuristic: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate_ideal_size(&self, stats: &IndexStats) -> u64;
}

fn page_size(stats: &IndexStats) -> u64 {
    if stats.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        stats.page_size
    }
}

/// `ceil(rows * key_width / (page_size * fillfactor)) * page_size`
#[derive(Debug, Clone, Copy)]
pub struct BtreeHeuristic {
    pub fillfactor: f64,
}

impl BloatHeuristic for BtreeHeuristic {
    fn name(&self) -> &'static str {
        "btree"
    }

    fn estimate_ideal_size(&self, stats: &IndexStats) -> u64 {
        let page = page_size(stats);
        let bytes = stats.row_count as f64 * f64::from(stats.avg_key_width);
        let pages = (bytes / (page as f64 * self.fillfactor)).ceil();
        (pages as u64).saturating_mul(page)
    }
}

/// `ceil(rows * pages_per_row) * page_size`. Placeholder, not calibrated.
#[derive(Debug, Clone, Copy)]
pub struct GinHeuristic {
    pub pages_per_row: f64,
}

impl BloatHeuristic for GinHeuristic {
    fn name(&self) -> &'static str {
        "gin"
    }

    fn estimate_ideal_size(&self, stats: &IndexStats) -> u64 {
        let pages = (stats.row_count as f64 * self.pages_per_row).ceil();
        (pages as u64).saturating_mul(page_size(stats))
    }
}

/// A fixed fraction of the current size, for every other access method.
#[derive(Debug, Clone, Copy)]
pub struct ConservativeHeuristic {
    pub fraction: f64,
}

impl BloatHeuristic for ConservativeHeuristic {
    fn name(&self) -> &'static str {
        "conservative"
    }

    fn estimate_ideal_size(&self, stats: &IndexStats) -> u64 {
        (stats.size_bytes as f64 * self.fraction).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::models::{AccessMethod, RelationKind, TargetDescriptor};

    fn stats(rows: u64, key_width: u32, size: u64) -> IndexStats {
        IndexStats {
            index: TargetDescriptor::resolve("public", "events_idx", RelationKind::Index).unwrap(),
            table: TargetDescriptor::resolve("public", "events", RelationKind::Table).unwrap(),
            access_method: AccessMethod::Btree,
            size_bytes: size,
            scan_count: 10_000,
            row_count: rows,
            avg_key_width: key_width,
            page_size: 8192,
            constraint_backing: false,
            valid: true,
        }
    }

    #[test]
    fn btree_rounds_up_to_whole_pages() {
        let h = BtreeHeuristic { fillfactor: 0.9 };
        // 1000 * 16 = 16000 bytes / 7372.8 per page = 2.17 -> 3 pages
        assert_eq!(h.estimate_ideal_size(&stats(1000, 16, 0)), 3 * 8192);
        assert_eq!(h.estimate_ideal_size(&stats(0, 16, 0)), 0);
    }

    #[test]
    fn gin_uses_pages_per_row() {
        let h = GinHeuristic { pages_per_row: 0.01 };
        assert_eq!(h.estimate_ideal_size(&stats(1_000, 0, 0)), 10 * 8192);
    }

    #[test]
    fn conservative_is_a_fraction_of_current() {
        let h = ConservativeHeuristic { fraction: 0.8 };
        assert_eq!(h.estimate_ideal_size(&stats(0, 0, 1000)), 800);
    }

    #[test]
    fn zero_page_size_falls_back_to_default() {
        let mut s = stats(1000, 16, 0);
        s.page_size = 0;
        let h = BtreeHeuristic { fillfactor: 0.9 };
        assert_eq!(h.estimate_ideal_size(&s), 3 * DEFAULT_PAGE_SIZE);
    }
}
