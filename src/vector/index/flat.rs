//! Exact brute-force index over content embeddings.

use std::io::Cursor;

use log::debug;

use crate::error::{ReelmatchError, Result};
use crate::vector::core::embedding::Embeddings;
use crate::vector::index::config::FlatIndexConfig;
use crate::vector::index::io::{read_f32s, read_header, read_len, write_f32s, write_header, write_len};
use crate::vector::index::{IndexKind, IndexStats, Neighbor, NeighborIndex, select_top_k};
use crate::vector::DistanceMetric;

const MAGIC: &[u8; 4] = b"RMFL";
const FORMAT_VERSION: u32 = 1;

/// Exact nearest-neighbor index using squared Euclidean distance.
///
/// Queries scan every stored vector. Results are sorted by ascending
/// distance with ties broken by ascending item index, so identical inputs
/// always give identical, bit-for-bit equal answers.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    config: FlatIndexConfig,
    vectors: Embeddings,
}

impl FlatIndex {
    /// Build an index over `vectors`; row `i` becomes item `i`.
    pub fn build(config: FlatIndexConfig, vectors: Embeddings) -> Result<Self> {
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

        debug!(
            "Built flat index: {} items, dimension {}",
            vectors.len(),
            vectors.dimension()
        );
        Ok(Self { config, vectors })
    }

    /// The `k` nearest items to an arbitrary query vector.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.config.dimension {
            return Err(ReelmatchError::index(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.config.dimension,
                query.len()
            )));
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(ReelmatchError::index("Query contains NaN or infinite values"));
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<&[f32]> = self.vectors.rows().collect();
        let distances = self.config.metric.batch_distance_parallel(query, &rows)?;
        let candidates = distances
            .into_iter()
            .enumerate()
            .map(|(item, distance)| Neighbor::new(item, distance))
            .collect();

        Ok(select_top_k(candidates, k))
    }

    /// The stored vectors.
    pub fn vectors(&self) -> &Embeddings {
        &self.vectors
    }

    /// The index configuration.
    pub fn config(&self) -> &FlatIndexConfig {
        &self.config
    }

    /// Serialize to the little-endian blob format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(24 + self.vectors.as_flat().len() * 4);
        write_header(&mut buffer, MAGIC, FORMAT_VERSION)?;
        write_len(&mut buffer, self.vectors.dimension())?;
        write_len(&mut buffer, self.vectors.len())?;
        write_f32s(&mut buffer, self.vectors.as_flat())?;
        Ok(buffer)
    }

    /// Deserialize a blob written by [`FlatIndex::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = Cursor::new(bytes);
        read_header(&mut input, MAGIC, FORMAT_VERSION)?;

        let max_values = bytes.len() / 4;
        let dimension = read_len(&mut input, max_values)?;
        if dimension == 0 {
            return Err(ReelmatchError::index_load("Flat index dimension is zero"));
        }
        let count = read_len(&mut input, max_values / dimension)?;
        let data = read_f32s(&mut input, count * dimension)?;

        if input.position() as usize != bytes.len() {
            return Err(ReelmatchError::index_load(format!(
                "Trailing bytes after flat index payload ({} of {})",
                input.position(),
                bytes.len()
            )));
        }

        let vectors = Embeddings::from_flat(dimension, data)?;
        Self::build(FlatIndexConfig::new(dimension), vectors)
            .map_err(|e| e.into_load_error("flat index"))
    }
}

impl NeighborIndex for FlatIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Flat
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
                "Item {item} out of range for flat index of {} items",
                self.vectors.len()
            ))
        })?;
        self.search(query, k)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::Flat,
            item_count: self.vectors.len(),
            dimension: self.config.dimension,
            metric: self.config.metric,
            n_trees: None,
        }
    }
}
