//! Sparse user×item rating matrix with dense id remapping.
//!
//! Arbitrary user and item identifiers are remapped to dense indexes by
//! sorting the distinct ids ascending, so identical input sets always
//! produce identical matrices regardless of record order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};

/// One rating observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord<U, I> {
    pub user: U,
    pub item: I,
    pub rating: f32,
}

impl<U, I> RatingRecord<U, I> {
    pub fn new(user: U, item: I, rating: f32) -> Self {
        Self { user, item, rating }
    }
}

/// Injective mapping from sorted distinct ids to `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdMapping<T> {
    ids: Vec<T>,
}

impl<T: Ord + Clone> IdMapping<T> {
    /// Build from any id sequence; duplicates collapse.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a T>) -> Self
    where
        T: 'a,
    {
        let distinct: BTreeSet<&T> = ids.into_iter().collect();
        Self {
            ids: distinct.into_iter().cloned().collect(),
        }
    }

    /// Dense index of `id`.
    pub fn index_of(&self, id: &T) -> Option<usize> {
        self.ids.binary_search(id).ok()
    }

    /// Id at dense index `index`.
    pub fn id_of(&self, index: usize) -> Option<&T> {
        self.ids.get(index)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in index order.
    pub fn ids(&self) -> &[T] {
        &self.ids
    }
}

/// Compressed sparse row matrix of `f32` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseMatrix {
    /// Build from `(row, col) -> value` entries. Iteration order of the map
    /// is row-major, which is exactly CSR order.
    pub fn from_entries(rows: usize, cols: usize, entries: &BTreeMap<(usize, usize), f32>) -> Result<Self> {
        let mut indptr = vec![0usize; rows + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());

        for (&(row, col), &value) in entries {
            if row >= rows || col >= cols {
                return Err(ReelmatchError::invalid_input(format!(
                    "Entry ({row}, {col}) outside matrix of shape ({rows}, {cols})"
                )));
            }
            indptr[row + 1] += 1;
            indices.push(col);
            values.push(value);
        }
        for row in 0..rows {
            indptr[row + 1] += indptr[row];
        }

        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            values,
        })
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indexes and values stored in `row`.
    pub fn row(&self, row: usize) -> (&[usize], &[f32]) {
        match (self.indptr.get(row), self.indptr.get(row + 1)) {
            (Some(&start), Some(&end)) => (&self.indices[start..end], &self.values[start..end]),
            _ => (&[], &[]),
        }
    }

    /// Value at `(row, col)`, zero when not stored.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let (indices, values) = self.row(row);
        indices
            .binary_search(&col)
            .map(|pos| values[pos])
            .unwrap_or(0.0)
    }

    /// The transposed matrix, still in CSR form.
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.cols + 1];
        for &col in &self.indices {
            counts[col + 1] += 1;
        }
        for col in 0..self.cols {
            counts[col + 1] += counts[col];
        }

        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0usize; self.nnz()];
        let mut values = vec![0f32; self.nnz()];
        for row in 0..self.rows {
            let (cols, vals) = self.row(row);
            for (&col, &value) in cols.iter().zip(vals) {
                let slot = next[col];
                indices[slot] = row;
                values[slot] = value;
                next[col] += 1;
            }
        }

        Self {
            rows: self.cols,
            cols: self.rows,
            indptr,
            indices,
            values,
        }
    }
}

/// The rating matrix together with its row and column mappings.
#[derive(Debug, Clone)]
pub struct RatingMatrix<U, I> {
    pub matrix: SparseMatrix,
    pub users: IdMapping<U>,
    pub items: IdMapping<I>,
}

/// Build the user×item matrix from rating records.
///
/// Duplicate `(user, item)` pairs are not summed: the later record
/// overwrites the earlier one.
pub fn build_rating_matrix<U, I>(records: &[RatingRecord<U, I>]) -> Result<RatingMatrix<U, I>>
where
    U: Ord + Clone,
    I: Ord + Clone,
{
    if records.is_empty() {
        return Err(ReelmatchError::empty_input("No rating records"));
    }

    let users = IdMapping::from_ids(records.iter().map(|r| &r.user));
    let items = IdMapping::from_ids(records.iter().map(|r| &r.item));

    let mut entries = BTreeMap::new();
    for record in records {
        if !record.rating.is_finite() {
            return Err(ReelmatchError::invalid_input(format!(
                "Non-finite rating {}",
                record.rating
            )));
        }
        let (Some(row), Some(col)) = (users.index_of(&record.user), items.index_of(&record.item))
        else {
            return Err(ReelmatchError::index("Id missing from its own mapping"));
        };
        entries.insert((row, col), record.rating);
    }

    let matrix = SparseMatrix::from_entries(users.len(), items.len(), &entries)?;
    Ok(RatingMatrix {
        matrix,
        users,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_remapped_in_sorted_order() {
        let records = vec![
            RatingRecord::new(30u32, "b".to_string(), 4.0),
            RatingRecord::new(10, "c".to_string(), 3.0),
            RatingRecord::new(20, "a".to_string(), 5.0),
            RatingRecord::new(10, "a".to_string(), 1.5),
        ];
        let built = build_rating_matrix(&records).unwrap();

        assert_eq!(built.users.ids(), &[10, 20, 30]);
        assert_eq!(built.items.ids(), &["a", "b", "c"]);
        assert_eq!(built.matrix.shape(), (3, 3));
        assert_eq!(built.matrix.nnz(), 4);
        assert_eq!(built.matrix.get(0, 0), 1.5);
        assert_eq!(built.matrix.get(0, 2), 3.0);
        assert_eq!(built.matrix.get(2, 1), 4.0);
        assert_eq!(built.matrix.get(1, 1), 0.0);
    }

    #[test]
    fn test_record_order_does_not_matter() {
        let mut records = vec![
            RatingRecord::new(2, 7, 1.0),
            RatingRecord::new(1, 9, 2.0),
            RatingRecord::new(3, 7, 3.0),
        ];
        let a = build_rating_matrix(&records).unwrap();
        records.reverse();
        let b = build_rating_matrix(&records).unwrap();
        assert_eq!(a.matrix, b.matrix);
        assert_eq!(a.items, b.items);
    }

    #[test]
    fn test_duplicate_pairs_overwrite() {
        let records = vec![
            RatingRecord::new(1, 1, 2.0),
            RatingRecord::new(1, 1, 4.5),
        ];
        let built = build_rating_matrix(&records).unwrap();
        assert_eq!(built.matrix.nnz(), 1);
        assert_eq!(built.matrix.get(0, 0), 4.5);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<RatingRecord<u32, u32>> = Vec::new();
        assert!(matches!(
            build_rating_matrix(&records),
            Err(ReelmatchError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_transpose() {
        let records = vec![
            RatingRecord::new(0, 0, 1.0),
            RatingRecord::new(0, 2, 2.0),
            RatingRecord::new(1, 1, 3.0),
            RatingRecord::new(1, 2, 4.0),
        ];
        let matrix = build_rating_matrix(&records).unwrap().matrix;
        let t = matrix.transpose();
        assert_eq!(t.shape(), (3, 2));
        for r in 0..2 {
            for c in 0..3 {
                assert_eq!(matrix.get(r, c), t.get(c, r));
            }
        }
        assert_eq!(t.row(2), (&[0usize, 1][..], &[2.0f32, 4.0][..]));
        assert_eq!(t.transpose(), matrix);
    }
}
