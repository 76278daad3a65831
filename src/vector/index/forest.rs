//! Approximate nearest-neighbor forest over collaborative embeddings.
//!
//! An ensemble of random-projection trees in the style of Annoy. Each tree
//! recursively splits the item set with a hyperplane through the origin
//! chosen by a small two-means pass, until a node holds at most
//! `leaf_size` items. A query walks all trees at once, expanding the node
//! whose splitting plane is furthest on the query's side first, collects
//! `search_k` distinct candidates and ranks them by exact angular distance.
//!
//! Trees use independent RNG streams seeded from `seed + tree_index`, so a
//! build is reproducible whether or not the trees are built in parallel.

pub mod tree;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Cursor;

use bincode::Options;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};
use crate::vector::DistanceMetric;
use crate::vector::core::embedding::Embeddings;
use crate::vector::index::config::ForestIndexConfig;
use crate::vector::index::io::{read_header, write_header};
use crate::vector::index::{IndexKind, IndexStats, Neighbor, NeighborIndex, select_top_k};

use self::tree::{Node, Tree, dot, normalize};

const MAGIC: &[u8; 4] = b"RMFO";
const FORMAT_VERSION: u32 = 1;

/// Approximate angular-distance index, queryable by item index only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestIndex {
    config: ForestIndexConfig,
    /// Unit-length copies of the input rows (zero rows stay zero).
    vectors: Embeddings,
    trees: Vec<Tree>,
}

impl ForestIndex {
    /// Build the forest, constructing trees in parallel.
    pub fn build(config: ForestIndexConfig, vectors: Embeddings) -> Result<Self> {
        Self::build_with_parallelism(config, vectors, true)
    }

    /// Build the forest, optionally on the current thread only. The result
    /// is identical either way.
    pub fn build_with_parallelism(
        config: ForestIndexConfig,
        mut vectors: Embeddings,
        parallel: bool,
    ) -> Result<Self> {
        config.validate()?;
        if vectors.dimension() != config.dimension {
            return Err(ReelmatchError::invalid_input(format!(
                "Vector dimension mismatch: expected {}, got {}",
                config.dimension,
                vectors.dimension()
            )));
        }
        if !vectors.is_valid() {
            return Err(ReelmatchError::invalid_input(
                "Embeddings contain NaN or infinite values",
            ));
        }

        for i in 0..vectors.len() {
            if let Some(row) = vectors.row_mut(i) {
                normalize(row);
            }
        }

        let seed_for = |t: usize| config.seed.wrapping_add(t as u64);
        let trees: Vec<Tree> = if parallel {
            (0..config.n_trees)
                .into_par_iter()
                .map(|t| Tree::build(&vectors, config.leaf_size, seed_for(t)))
                .collect()
        } else {
            (0..config.n_trees)
                .map(|t| Tree::build(&vectors, config.leaf_size, seed_for(t)))
                .collect()
        };

        debug!(
            "Built forest index: {} items, {} trees, {} nodes",
            vectors.len(),
            trees.len(),
            trees.iter().map(Tree::node_count).sum::<usize>()
        );

        Ok(Self {
            config,
            vectors,
            trees,
        })
    }

    /// Up to `k` items approximately nearest to `item`, closest first.
    pub fn search(&self, item: usize, k: usize) -> Result<Vec<usize>> {
        Ok(self
            .neighbors_of(item, k)?
            .into_iter()
            .map(|n| n.item)
            .collect())
    }

    /// The index configuration.
    pub fn config(&self) -> &ForestIndexConfig {
        &self.config
    }

    /// Number of trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn candidates(&self, query: &[f32], search_k: usize) -> Vec<usize> {
        let mut seen = vec![false; self.vectors.len()];
        let mut found = Vec::with_capacity(search_k);

        let mut queue: BinaryHeap<Frontier> = self
            .trees
            .iter()
            .enumerate()
            .map(|(tree, t)| Frontier {
                priority: f32::INFINITY,
                tree,
                node: t.root,
            })
            .collect();

        while found.len() < search_k {
            let Some(Frontier {
                priority,
                tree,
                node,
            }) = queue.pop()
            else {
                break;
            };

            match &self.trees[tree].nodes[node] {
                Node::Leaf { items } => {
                    for &item in items {
                        if !seen[item] {
                            seen[item] = true;
                            found.push(item);
                        }
                    }
                }
                Node::Split {
                    normal,
                    left,
                    right,
                } => {
                    let margin = dot(normal, query);
                    queue.push(Frontier {
                        priority: priority.min(margin),
                        tree,
                        node: *right,
                    });
                    queue.push(Frontier {
                        priority: priority.min(-margin),
                        tree,
                        node: *left,
                    });
                }
            }
        }

        found
    }

    /// Serialize to a bincode blob behind a magic header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        write_header(&mut buffer, MAGIC, FORMAT_VERSION)?;
        bincode::DefaultOptions::new().serialize_into(&mut buffer, self)?;
        Ok(buffer)
    }

    /// Deserialize a blob written by [`ForestIndex::to_bytes`] and check it
    /// against the persisted config record.
    pub fn from_bytes(bytes: &[u8], expected: &ForestIndexConfig) -> Result<Self> {
        let mut input = Cursor::new(bytes);
        read_header(&mut input, MAGIC, FORMAT_VERSION)?;
        let payload = &bytes[input.position() as usize..];
        let index: ForestIndex = bincode::DefaultOptions::new()
            .with_limit(bytes.len() as u64)
            .deserialize(payload)
            .map_err(|e| ReelmatchError::from(e).into_load_error("forest index"))?;

        index.config.validate().map_err(|e| e.into_load_error("forest index"))?;
        if index.config != *expected {
            return Err(ReelmatchError::index_load(format!(
                "Forest config record mismatch: blob has dimension {} / {} trees, record has dimension {} / {} trees",
                index.config.dimension, index.config.n_trees, expected.dimension, expected.n_trees
            )));
        }
        if index.vectors.dimension() != index.config.dimension
            || index.vectors.as_flat().len() % index.config.dimension != 0
            || index.trees.len() != index.config.n_trees
            || !index.vectors.is_valid()
            || !index
                .trees
                .iter()
                .all(|t| t.is_consistent(index.vectors.len(), index.config.dimension))
        {
            return Err(ReelmatchError::index_load("Forest index structure is corrupt"));
        }
        Ok(index)
    }
}

impl NeighborIndex for ForestIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Forest
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    fn neighbors_of(&self, item: usize, k: usize) -> Result<Vec<Neighbor>> {
        let query = self.vectors.row(item).ok_or_else(|| {
            ReelmatchError::index(format!(
                "Item {item} out of range for forest index of {} items",
                self.vectors.len()
            ))
        })?;
        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let search_k = self.config.effective_search_k(k).min(self.vectors.len());
        let candidates = self.candidates(query, search_k);
        debug!(
            "Forest query for item {item}: {} candidates (search_k {search_k})",
            candidates.len()
        );

        let ranked = candidates
            .into_iter()
            .filter_map(|candidate| {
                self.vectors.row(candidate).map(|v| {
                    Neighbor::new(candidate, self.config.metric.distance_unchecked(query, v))
                })
            })
            .collect();
        Ok(select_top_k(ranked, k))
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::Forest,
            item_count: self.vectors.len(),
            dimension: self.config.dimension,
            metric: self.config.metric,
            n_trees: Some(self.trees.len()),
        }
    }
}

/// Pending node in the shared traversal queue; larger priority pops first.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    priority: f32,
    tree: usize,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.tree.cmp(&self.tree))
            .then_with(|| other.node.cmp(&self.node))
    }
}
