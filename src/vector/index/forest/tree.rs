//! A single random-projection tree.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::vector::core::embedding::Embeddings;

/// Sample draws used to refine the two split centroids.
const TWO_MEANS_ITERATIONS: usize = 200;

/// Split attempts before falling back to an arbitrary partition.
const MAX_SPLIT_ATTEMPTS: usize = 3;

/// A tree node. Children are positions in [`Tree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Inner node: items with a positive margin against `normal` go right.
    Split {
        normal: Vec<f32>,
        left: usize,
        right: usize,
    },
    /// Terminal bucket of item indexes.
    Leaf { items: Vec<usize> },
}

/// One tree of the forest, stored as a flat node arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: usize,
}

impl Tree {
    /// Build a tree over every row of `vectors`, which must be unit length
    /// (or zero).
    pub fn build(vectors: &Embeddings, leaf_size: usize, seed: u64) -> Self {
        let mut builder = TreeBuilder {
            vectors,
            leaf_size,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        let items: Vec<usize> = (0..vectors.len()).collect();
        let root = builder.grow(items);
        Tree {
            nodes: builder.nodes,
            root,
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check that every child reference points inside the arena and every
    /// leaf item is below `item_count`.
    pub(crate) fn is_consistent(&self, item_count: usize, dimension: usize) -> bool {
        if self.root >= self.nodes.len() {
            return false;
        }
        self.nodes.iter().all(|node| match node {
            Node::Split {
                normal,
                left,
                right,
            } => normal.len() == dimension && *left < self.nodes.len() && *right < self.nodes.len(),
            Node::Leaf { items } => items.iter().all(|&item| item < item_count),
        })
    }
}

struct TreeBuilder<'a> {
    vectors: &'a Embeddings,
    leaf_size: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, items: Vec<usize>) -> usize {
        if items.len() <= self.leaf_size {
            return self.push(Node::Leaf { items });
        }

        let (normal, left, right) = self.split(items);
        let left = self.grow(left);
        let right = self.grow(right);
        self.push(Node::Split {
            normal,
            left,
            right,
        })
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn split(&mut self, items: Vec<usize>) -> (Vec<f32>, Vec<usize>, Vec<usize>) {
        for _ in 0..MAX_SPLIT_ATTEMPTS {
            let normal = self.two_means_normal(&items);
            let (left, right) = self.partition(&items, &normal);
            if !left.is_empty() && !right.is_empty() {
                return (normal, left, right);
            }
        }

        // Every attempt put all items on one side (duplicates or zero
        // vectors). Split in halves under a zero normal; queries then
        // explore both children with equal priority.
        let mut shuffled = items;
        shuffled.shuffle(&mut self.rng);
        let right = shuffled.split_off(shuffled.len() / 2);
        (vec![0.0; self.vectors.dimension()], shuffled, right)
    }

    fn partition(&mut self, items: &[usize], normal: &[f32]) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::with_capacity(items.len() / 2);
        let mut right = Vec::with_capacity(items.len() / 2);
        for &item in items {
            let margin = dot(normal, self.row(item));
            let goes_right = if margin == 0.0 {
                self.rng.random_bool(0.5)
            } else {
                margin > 0.0
            };
            if goes_right {
                right.push(item);
            } else {
                left.push(item);
            }
        }
        (left, right)
    }

    /// Hyperplane normal separating two centroids found by a sampled
    /// two-means pass.
    fn two_means_normal(&mut self, items: &[usize]) -> Vec<f32> {
        let count = items.len();
        let i = self.rng.random_range(0..count);
        let mut j = self.rng.random_range(0..count - 1);
        if j >= i {
            j += 1;
        }

        let mut p = self.row(items[i]).to_vec();
        let mut q = self.row(items[j]).to_vec();
        let mut p_count = 1.0f32;
        let mut q_count = 1.0f32;

        for _ in 0..TWO_MEANS_ITERATIONS {
            let pick = self.rng.random_range(0..count);
            let v = self.row(items[pick]);
            let dp = p_count * cosine_distance(&p, v);
            let dq = q_count * cosine_distance(&q, v);
            if dp < dq {
                merge_into(&mut p, p_count, v);
                p_count += 1.0;
            } else if dq < dp {
                merge_into(&mut q, q_count, v);
                q_count += 1.0;
            }
        }

        let mut normal: Vec<f32> = p.iter().zip(q.iter()).map(|(a, b)| a - b).collect();
        normalize(&mut normal);
        normal
    }

    fn row(&self, item: usize) -> &[f32] {
        let dim = self.vectors.dimension();
        &self.vectors.as_flat()[item * dim..(item + 1) * dim]
    }
}

/// Running-average update of a unit centroid with a new member.
fn merge_into(centroid: &mut [f32], count: f32, v: &[f32]) {
    for (c, x) in centroid.iter_mut().zip(v.iter()) {
        *c = (*c * count + x) / (count + 1.0);
    }
    normalize(centroid);
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    2.0 - 2.0 * dot(a, b)
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale to unit length; zero vectors stay zero.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
