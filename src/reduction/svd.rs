//! Truncated SVD for the sparse rating matrix.

use nalgebra::DMatrix;

use crate::error::{ReelmatchError, Result};
use crate::matrix::SparseMatrix;
use crate::reduction::{Decomposition, FullFit, descending_eigen, flip_sign};

/// Uncentered singular value decomposition of a sparse matrix.
///
/// Singular values come from the smaller of the two Gram matrices (`X Xᵀ`
/// or `Xᵀ X`), so only a dense `min(rows, cols)²` matrix is materialized.
/// Scores are `U Σ`. The explained-variance ratio of a component is the
/// variance of its score column over the summed column variances of `X`;
/// because the input is not centered these ratios may sum to less than one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncatedSvd;

impl Decomposition for TruncatedSvd {
    type Input = SparseMatrix;

    fn name(&self) -> &'static str {
        "truncated_svd"
    }

    fn fit_full(&self, x: &SparseMatrix) -> Result<FullFit> {
        let (rows, cols) = x.shape();
        if rows == 0 || cols == 0 || x.nnz() == 0 {
            return Err(ReelmatchError::empty_input(format!(
                "SVD input has shape ({rows}, {cols}) with {} entries",
                x.nnz()
            )));
        }

        let rank = rows.min(cols);
        let mut scores = if rows <= cols {
            // X Xᵀ is the Gram matrix of the rows of Xᵀ.
            let (values, vectors) = descending_eigen(gram(&x.transpose(), rows));
            DMatrix::from_fn(rows, rank, |r, c| vectors[(r, c)] * values[c].sqrt())
        } else {
            let (_, vectors) = descending_eigen(gram(x, cols));
            project(x, &vectors, rank)
        };
        for c in 0..rank {
            flip_sign(&mut scores, c);
        }

        let total = column_variance_sum(x);
        let explained_variance_ratio = (0..rank)
            .map(|c| {
                if total > 0.0 {
                    let column: Vec<f64> = scores.column(c).iter().copied().collect();
                    population_variance(&column) / total
                } else {
                    0.0
                }
            })
            .collect();

        Ok(FullFit {
            scores,
            explained_variance_ratio,
        })
    }
}

/// `Aᵀ A` for a CSR matrix `A` with `dim` columns, accumulated one row's
/// outer product at a time.
fn gram(a: &SparseMatrix, dim: usize) -> DMatrix<f64> {
    let mut g = DMatrix::zeros(dim, dim);
    for row in 0..a.shape().0 {
        let (indices, values) = a.row(row);
        for (&i, &vi) in indices.iter().zip(values) {
            for (&j, &vj) in indices.iter().zip(values) {
                g[(i, j)] += f64::from(vi) * f64::from(vj);
            }
        }
    }
    g
}

/// `X V[:, ..rank]` with sparse `X`.
fn project(x: &SparseMatrix, v: &DMatrix<f64>, rank: usize) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(x.shape().0, rank);
    for row in 0..x.shape().0 {
        let (indices, values) = x.row(row);
        for (&j, &value) in indices.iter().zip(values) {
            for c in 0..rank {
                out[(row, c)] += f64::from(value) * v[(j, c)];
            }
        }
    }
    out
}

/// Sum over columns of each column's population variance.
fn column_variance_sum(x: &SparseMatrix) -> f64 {
    let (rows, cols) = x.shape();
    let mut sums = vec![0.0f64; cols];
    let mut squares = vec![0.0f64; cols];
    for row in 0..rows {
        let (indices, values) = x.row(row);
        for (&j, &value) in indices.iter().zip(values) {
            let value = f64::from(value);
            sums[j] += value;
            squares[j] += value * value;
        }
    }
    let n = rows as f64;
    sums.iter()
        .zip(squares.iter())
        .map(|(s, sq)| (sq / n - (s / n).powi(2)).max(0.0))
        .sum()
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::reduction::{VarianceThreshold, reduce};

    fn sparse(rows: usize, cols: usize, dense: &[f32]) -> SparseMatrix {
        let mut entries = BTreeMap::new();
        for r in 0..rows {
            for c in 0..cols {
                let value = dense[r * cols + c];
                if value != 0.0 {
                    entries.insert((r, c), value);
                }
            }
        }
        SparseMatrix::from_entries(rows, cols, &entries).unwrap()
    }

    /// Items × users.
    fn ratings() -> SparseMatrix {
        sparse(
            5,
            4,
            &[
                5.0, 4.0, 0.0, 1.0, //
                4.0, 5.0, 0.0, 0.0, //
                0.0, 1.0, 5.0, 4.0, //
                1.0, 0.0, 4.0, 5.0, //
                0.0, 0.0, 3.0, 0.0,
            ],
        )
    }

    fn gram_rows(scores: &DMatrix<f64>) -> DMatrix<f64> {
        scores * scores.transpose()
    }

    #[test]
    fn test_both_orientations_agree() {
        let x = ratings();
        let tall = TruncatedSvd.fit_full(&x).unwrap();
        let wide = TruncatedSvd.fit_full(&x.transpose()).unwrap();

        assert_eq!(tall.scores.shape(), (5, 4));
        assert_eq!(wide.scores.shape(), (4, 4));

        // U Σ (U Σ)ᵀ = X Xᵀ regardless of orientation.
        let dense = DMatrix::from_fn(5, 4, |r, c| f64::from(x.get(r, c)));
        let expected = &dense * dense.transpose();
        assert!((gram_rows(&tall.scores) - expected).abs().max() < 1e-8);
    }

    #[test]
    fn test_singular_values_descend() {
        let fit = TruncatedSvd.fit_full(&ratings()).unwrap();
        let norms: Vec<f64> = (0..4).map(|c| fit.scores.column(c).norm()).collect();
        for pair in norms.windows(2) {
            assert!(pair[0] + 1e-9 >= pair[1]);
        }
        let total: f64 = fit.explained_variance_ratio.iter().sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_reduce_respects_threshold() {
        let x = ratings();
        let loose = reduce(&TruncatedSvd, &x, VarianceThreshold::new(0.5).unwrap()).unwrap();
        let strict = reduce(&TruncatedSvd, &x, VarianceThreshold::new(1.0).unwrap()).unwrap();
        assert!(loose.k <= strict.k);
        assert_eq!(loose.embeddings.len(), 5);
        assert_eq!(strict.embeddings.dimension(), strict.k);
    }

    #[test]
    fn test_deterministic() {
        let a = TruncatedSvd.fit_full(&ratings()).unwrap();
        let b = TruncatedSvd.fit_full(&ratings()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let empty = SparseMatrix::from_entries(3, 3, &BTreeMap::new()).unwrap();
        assert!(matches!(
            TruncatedSvd.fit_full(&empty),
            Err(ReelmatchError::EmptyInput(_))
        ));
    }
}
