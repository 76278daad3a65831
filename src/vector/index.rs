//! Nearest-neighbor index structures.
//!
//! Both indexes are immutable once built: they are created during the
//! offline build, persisted, then loaded read-only for serving. The
//! recommendation engine talks to them only through [`NeighborIndex`], so a
//! different structure (a graph index, a quantized flat index, ...) can be
//! dropped in without touching the engine.
//!
//! - [`flat::FlatIndex`]: exact brute-force scan, squared Euclidean distance
//! - [`forest::ForestIndex`]: approximate random-projection forest, angular distance

pub mod config;
pub mod flat;
pub mod forest;
pub mod io;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vector::DistanceMetric;

pub use self::config::{FlatIndexConfig, ForestIndexConfig};
pub use self::flat::FlatIndex;
pub use self::forest::ForestIndex;

/// One search hit: an item index and its distance from the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Dense item index.
    pub item: usize,
    /// Distance under the index's metric (smaller is closer).
    pub distance: f32,
}

impl Neighbor {
    /// Create a new neighbor.
    pub fn new(item: usize, distance: f32) -> Self {
        Self { item, distance }
    }

    /// Total order: ascending distance, then ascending item index.
    pub fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.item.cmp(&other.item))
    }
}

/// Keep the `k` closest neighbors, sorted by [`Neighbor::cmp_by_distance`].
pub(crate) fn select_top_k(mut candidates: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, Neighbor::cmp_by_distance);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(Neighbor::cmp_by_distance);
    candidates
}

/// Which index structure answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact brute-force index over content embeddings.
    Flat,
    /// Approximate forest index over collaborative embeddings.
    Forest,
}

/// Statistics about an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// The structure answering queries.
    pub kind: IndexKind,
    /// Number of indexed items.
    pub item_count: usize,
    /// Embedding dimension.
    pub dimension: usize,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Number of trees (forest only).
    pub n_trees: Option<usize>,
}

/// Read-only neighbor lookup over a closed set of items.
///
/// Implementations must be safe to share across threads; every method takes
/// `&self` and never mutates the structure.
pub trait NeighborIndex: Send + Sync + std::fmt::Debug {
    /// The structure behind this index.
    fn kind(&self) -> IndexKind;

    /// Number of indexed items.
    fn len(&self) -> usize;

    /// Whether the index holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Distance metric used for ranking.
    fn metric(&self) -> DistanceMetric;

    /// Up to `k` neighbors of an already indexed item, in the index's ranking
    /// order. The item itself is normally among them.
    fn neighbors_of(&self, item: usize, k: usize) -> Result<Vec<Neighbor>>;

    /// Index statistics.
    fn stats(&self) -> IndexStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_top_k_orders_ties_by_item() {
        let candidates = vec![
            Neighbor::new(4, 2.0),
            Neighbor::new(3, 2.0),
            Neighbor::new(1, 0.0),
            Neighbor::new(2, 2.0),
            Neighbor::new(0, 0.0),
        ];
        let top = select_top_k(candidates, 3);
        let items: Vec<usize> = top.iter().map(|n| n.item).collect();
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn test_select_top_k_edge_sizes() {
        let candidates = vec![Neighbor::new(1, 1.0), Neighbor::new(0, 3.0)];
        assert!(select_top_k(candidates.clone(), 0).is_empty());

        let all = select_top_k(candidates, 10);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item, 1);
    }
}
