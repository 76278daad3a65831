//! Dense, row-major embedding matrix.

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};

/// A fixed-width matrix of `f32` embeddings, one row per item.
///
/// Every row has the same dimension; the row index is the item index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    dimension: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// Wrap a flat row-major buffer.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(ReelmatchError::invalid_input(
                "Embedding dimension must be > 0",
            ));
        }
        if data.len() % dimension != 0 {
            return Err(ReelmatchError::invalid_input(format!(
                "Buffer of {} values is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Build from a list of equally sized rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dimension = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| ReelmatchError::empty_input("No embedding rows"))?;

        let mut data = Vec::with_capacity(rows.len() * dimension);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                return Err(ReelmatchError::invalid_input(format!(
                    "Row {i} has {} columns, expected {dimension}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        Self::from_flat(dimension, data)
    }

    /// An all-zero matrix.
    pub fn zeros(rows: usize, dimension: usize) -> Result<Self> {
        Self::from_flat(dimension, vec![0.0; rows * dimension])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row width.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Borrow row `index`.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Mutable access to row `index`.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.data.get_mut(start..start + self.dimension)
    }

    /// Iterate over rows in index order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }

    /// The flat row-major buffer.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Check that no value is NaN or infinite.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}
