//! # Reelmatch
//!
//! Item-to-item movie recommendations over two independent similarity
//! indexes built from one catalog:
//!
//! - an **exact** index over PCA-reduced content features (genres and
//!   release decade), searched by brute-force Euclidean distance;
//! - an **approximate** index over truncated-SVD collaborative embeddings
//!   of the item × user rating matrix, searched with a forest of
//!   random-projection trees under angular distance.
//!
//! A build turns item and rating tables into a persisted artifact set;
//! serving loads that set once into an immutable [`Catalog`] and answers
//! "more like this title" requests from any number of threads.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelmatch::catalog::ArtifactStore;
//! use reelmatch::recommend::{ModelChoice, Recommender};
//! use reelmatch::storage::{StorageConfig, file::FileStorage};
//!
//! # fn main() -> reelmatch::Result<()> {
//! let storage = FileStorage::open("artifacts", StorageConfig::default())?;
//! let catalog = ArtifactStore::new(Arc::new(storage)).load()?;
//! let recommender = Recommender::new(Arc::new(catalog));
//! for hit in recommender.recommend_title("Toy Story", ModelChoice::Exact, 5)? {
//!     println!("{}", hit.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod matrix;
pub mod recommend;
pub mod reduction;
pub mod storage;
pub mod util;
pub mod vector;

pub use crate::catalog::{ArtifactStore, Catalog, CatalogBuilder};
pub use crate::config::BuildConfig;
pub use crate::error::{ReelmatchError, Result};
pub use crate::recommend::{ModelChoice, Recommendation, RecommendationRequest, Recommender};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
