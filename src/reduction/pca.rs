//! Principal component analysis for the content feature matrix.

use nalgebra::DMatrix;

use crate::error::{ReelmatchError, Result};
use crate::reduction::{Decomposition, FullFit, descending_eigen, flip_sign};

/// Covariance-eigendecomposition PCA.
///
/// The number of components is `min(n_samples, n_features)`. Ratios are
/// eigenvalues over the total variance of the centered data; if every row
/// is identical the total is zero and all ratios are zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pca;

impl Decomposition for Pca {
    type Input = DMatrix<f64>;

    fn name(&self) -> &'static str {
        "pca"
    }

    fn fit_full(&self, x: &DMatrix<f64>) -> Result<FullFit> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 || n_features == 0 {
            return Err(ReelmatchError::empty_input(format!(
                "PCA input has shape ({n_samples}, {n_features})"
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ReelmatchError::invalid_input(
                "PCA input contains NaN or infinite values",
            ));
        }

        let mut centered = x.clone();
        for mut column in centered.column_iter_mut() {
            let mean = column.sum() / n_samples as f64;
            column.add_scalar_mut(-mean);
        }

        let denominator = n_samples.saturating_sub(1).max(1) as f64;
        let covariance = (centered.transpose() * &centered) / denominator;
        let (eigenvalues, mut eigenvectors) = descending_eigen(covariance);

        let n_components = n_samples.min(n_features);
        for c in 0..n_components {
            flip_sign(&mut eigenvectors, c);
        }

        let total: f64 = eigenvalues.iter().sum();
        let explained_variance_ratio = eigenvalues
            .iter()
            .take(n_components)
            .map(|&value| if total > 0.0 { value / total } else { 0.0 })
            .collect();

        let components = eigenvectors.columns(0, n_components);
        let scores = &centered * components;

        Ok(FullFit {
            scores,
            explained_variance_ratio,
        })
    }
}
