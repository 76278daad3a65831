//! Dimensionality reduction under a variance-threshold policy.
//!
//! A [`Decomposition`] produces a full-rank fit: one score column per
//! component and the explained-variance ratio of each. [`reduce`] picks the
//! smallest rank reaching the threshold from those ratios and keeps the
//! first `k` score columns of that same fit, so the rank choice and the
//! returned embedding never come from two different fits.
//!
//! - [`pca::Pca`]: centered covariance decomposition for dense features
//! - [`svd::TruncatedSvd`]: uncentered decomposition for sparse ratings

pub mod pca;
pub mod policy;
pub mod svd;

use log::info;
use nalgebra::{DMatrix, SymmetricEigen};

use crate::error::{ReelmatchError, Result};
use crate::vector::Embeddings;

pub use self::pca::Pca;
pub use self::policy::{DEFAULT_VARIANCE_THRESHOLD, VarianceThreshold, select_components};
pub use self::svd::TruncatedSvd;

/// Full-rank result of a decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct FullFit {
    /// Row projections, one column per component, strongest first.
    pub scores: DMatrix<f64>,
    /// Explained-variance ratio per component.
    pub explained_variance_ratio: Vec<f64>,
}

impl FullFit {
    pub fn component_count(&self) -> usize {
        self.explained_variance_ratio.len()
    }
}

/// A linear decomposition that can be fitted at full rank.
pub trait Decomposition {
    /// Matrix type the decomposition consumes; rows are the embedded entities.
    type Input: ?Sized;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fit every component.
    fn fit_full(&self, input: &Self::Input) -> Result<FullFit>;
}

/// A reduced embedding together with the policy's choice of rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedEmbedding {
    pub embeddings: Embeddings,
    pub k: usize,
    /// Ratios of every component of the full fit.
    pub explained_variance_ratio: Vec<f64>,
}

impl ReducedEmbedding {
    /// Variance retained by the first `k` components.
    pub fn retained_variance(&self) -> f64 {
        self.explained_variance_ratio
            .iter()
            .take(self.k)
            .map(|r| r.max(0.0))
            .sum()
    }
}

/// Fit `decomposition` and keep the fewest components reaching `threshold`.
pub fn reduce<D: Decomposition>(
    decomposition: &D,
    input: &D::Input,
    threshold: VarianceThreshold,
) -> Result<ReducedEmbedding> {
    let fit = decomposition.fit_full(input)?;
    let k = threshold.select(&fit.explained_variance_ratio);
    if k == 0 {
        return Err(ReelmatchError::empty_input(format!(
            "{} produced no components",
            decomposition.name()
        )));
    }

    let rows = fit.scores.nrows();
    let mut data = Vec::with_capacity(rows * k);
    for r in 0..rows {
        for c in 0..k {
            data.push(fit.scores[(r, c)] as f32);
        }
    }
    let embeddings = Embeddings::from_flat(k, data)?;

    let reduced = ReducedEmbedding {
        embeddings,
        k,
        explained_variance_ratio: fit.explained_variance_ratio,
    };
    info!(
        "{}: kept {} of {} components ({:.4} of variance, threshold {})",
        decomposition.name(),
        k,
        reduced.explained_variance_ratio.len(),
        reduced.retained_variance(),
        threshold.value()
    );
    Ok(reduced)
}

/// Eigendecomposition of a symmetric matrix with eigenpairs sorted by
/// descending eigenvalue (ties keep their original order). Negative
/// eigenvalues from round-off are clamped to zero.
pub(crate) fn descending_eigen(matrix: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let n = matrix.nrows();
    let eigen = SymmetricEigen::new(matrix);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let values = order
        .iter()
        .map(|&i| eigen.eigenvalues[i].max(0.0))
        .collect();
    let vectors = DMatrix::from_fn(n, n, |r, c| eigen.eigenvectors[(r, order[c])]);
    (values, vectors)
}

/// Flip the sign of a column so its largest-magnitude entry is positive.
pub(crate) fn flip_sign(matrix: &mut DMatrix<f64>, column: usize) {
    let mut pivot = 0.0f64;
    for value in matrix.column(column).iter() {
        if value.abs() > pivot.abs() {
            pivot = *value;
        }
    }
    if pivot < 0.0 {
        matrix.column_mut(column).neg_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_eigen_order() {
        let matrix = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 3.0]);
        let (values, vectors) = descending_eigen(matrix);
        assert!((values[0] - 5.0).abs() < 1e-12);
        assert!((values[1] - 3.0).abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
        assert!((vectors[(1, 0)].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flip_sign() {
        let mut matrix = DMatrix::from_row_slice(3, 1, &[0.2, -0.9, 0.5]);
        flip_sign(&mut matrix, 0);
        assert_eq!(matrix[(1, 0)], 0.9);
        assert_eq!(matrix[(0, 0)], -0.2);
    }
}
