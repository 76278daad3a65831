//! Configuration types for vector indexes.

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};
use crate::vector::DistanceMetric;

/// Configuration for the exact flat index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndexConfig {
    /// Vector dimension.
    pub dimension: usize,
    /// Distance metric. Only squared Euclidean is accepted.
    pub metric: DistanceMetric,
}

impl FlatIndexConfig {
    /// Create a new flat index configuration with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            metric: DistanceMetric::SquaredEuclidean,
        }
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ReelmatchError::invalid_config(
                "Flat index dimension must be > 0",
            ));
        }
        if self.metric != DistanceMetric::SquaredEuclidean {
            return Err(ReelmatchError::invalid_config(format!(
                "Flat index requires squared_euclidean, got {}",
                self.metric
            )));
        }
        Ok(())
    }
}

/// Configuration for the approximate forest index.
///
/// This is also the persisted config record of the approximate index
/// (`{"dimension": .., "metric": "angular", ...}`); it is re-validated when
/// an artifact set is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestIndexConfig {
    /// Vector dimension. Filled in from the reduced embedding at build time.
    pub dimension: usize,
    /// Distance metric. Only angular is accepted.
    pub metric: DistanceMetric,
    /// Number of trees. More trees raise recall and build time.
    pub n_trees: usize,
    /// Maximum number of items stored in a leaf.
    pub leaf_size: usize,
    /// Seed for the split-plane RNG, so rebuilds are reproducible.
    pub seed: u64,
    /// Candidates inspected per query; `None` means `n_trees * k`.
    pub search_k: Option<usize>,
}

impl Default for ForestIndexConfig {
    fn default() -> Self {
        Self {
            dimension: 0,
            metric: DistanceMetric::Angular,
            n_trees: 20,
            leaf_size: 16,
            seed: 42,
            search_k: None,
        }
    }
}

impl ForestIndexConfig {
    /// Create a new forest configuration with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Set the number of trees.
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the leaf size.
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a fixed per-query candidate budget.
    pub fn with_search_k(mut self, search_k: usize) -> Self {
        self.search_k = Some(search_k);
        self
    }

    /// Candidates to inspect for a query asking for `k` results.
    pub fn effective_search_k(&self, k: usize) -> usize {
        self.search_k
            .unwrap_or_else(|| self.n_trees.saturating_mul(k))
            .max(k)
    }

    /// Validate everything except the dimension (unknown before reduction).
    pub fn validate_params(&self) -> Result<()> {
        if self.metric != DistanceMetric::Angular {
            return Err(ReelmatchError::invalid_config(format!(
                "Forest index requires angular, got {}",
                self.metric
            )));
        }
        if self.n_trees == 0 {
            return Err(ReelmatchError::invalid_config("n_trees must be > 0"));
        }
        if self.leaf_size == 0 {
            return Err(ReelmatchError::invalid_config("leaf_size must be > 0"));
        }
        if self.search_k == Some(0) {
            return Err(ReelmatchError::invalid_config("search_k must be > 0"));
        }
        Ok(())
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ReelmatchError::invalid_config(
                "Forest index dimension must be > 0",
            ));
        }
        self.validate_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_config_validation() {
        assert!(FlatIndexConfig::new(3).validate().is_ok());
        assert!(FlatIndexConfig::new(0).validate().is_err());

        let mut config = FlatIndexConfig::new(3);
        config.metric = DistanceMetric::Angular;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forest_config_defaults() {
        let config = ForestIndexConfig::new(8);
        assert_eq!(config.n_trees, 20);
        assert_eq!(config.metric, DistanceMetric::Angular);
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_search_k(5), 100);
        assert_eq!(config.clone().with_search_k(3).effective_search_k(5), 5);
    }

    #[test]
    fn test_forest_config_validation() {
        assert!(ForestIndexConfig::new(0).validate().is_err());
        assert!(ForestIndexConfig::new(0).validate_params().is_ok());
        assert!(ForestIndexConfig::new(4).with_n_trees(0).validate().is_err());
        assert!(ForestIndexConfig::new(4).with_leaf_size(0).validate().is_err());

        let mut config = ForestIndexConfig::new(4);
        config.metric = DistanceMetric::SquaredEuclidean;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forest_config_record_round_trip() {
        let json = r#"{"dimension": 12, "metric": "angular", "n_trees": 20, "leaf_size": 16, "seed": 7}"#;
        let config: ForestIndexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dimension, 12);
        assert_eq!(config.search_k, None);
        assert!(config.validate().is_ok());

        let minimal: ForestIndexConfig =
            serde_json::from_str(r#"{"dimension": 5, "metric": "angular"}"#).unwrap();
        assert_eq!(minimal.n_trees, 20);
        assert!(minimal.validate().is_ok());

        let bad = r#"{"dimension": 12, "metric": "dot", "n_trees": 20, "leaf_size": 16, "seed": 7}"#;
        assert!(serde_json::from_str::<ForestIndexConfig>(bad).is_err());
    }
}
