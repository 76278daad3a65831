//! Build configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};
use crate::reduction::VarianceThreshold;
use crate::vector::index::ForestIndexConfig;

/// Parameters of an offline catalog build.
///
/// ```
/// use reelmatch::config::BuildConfig;
///
/// let config = BuildConfig::default().with_n_trees(50).with_seed(7);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.forest.n_trees, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Minimum cumulative explained variance kept by both reductions.
    pub variance_threshold: VarianceThreshold,
    /// Approximate index parameters; `dimension` is filled in by the build.
    pub forest: ForestIndexConfig,
    /// Build forest trees on the rayon pool.
    pub parallel_build: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            variance_threshold: VarianceThreshold::default(),
            forest: ForestIndexConfig::default(),
            parallel_build: true,
        }
    }
}

impl BuildConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ReelmatchError::invalid_config(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: BuildConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_variance_threshold(mut self, threshold: f64) -> Result<Self> {
        self.variance_threshold = VarianceThreshold::new(threshold)?;
        Ok(self)
    }

    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.forest.n_trees = n_trees;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.forest.seed = seed;
        self
    }

    pub fn with_parallel_build(mut self, parallel: bool) -> Self {
        self.parallel_build = parallel;
        self
    }

    /// Validate everything known before the data is seen.
    pub fn validate(&self) -> Result<()> {
        self.forest.validate_params()
    }
}
