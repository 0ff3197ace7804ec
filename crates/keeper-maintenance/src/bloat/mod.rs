//! Index bloat analysis: estimate an ideal size per index and flag the ones
//! worth rebuilding.

pub mod analyzer;
pub mod heuristics;

pub use analyzer::IndexBloatAnalyzer;
pub use heuristics::{BloatHeuristic, BtreeHeuristic, ConservativeHeuristic, GinHeuristic};
