//! Offline catalog build.

use ahash::AHashMap;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::artifacts::{FORMAT_VERSION, Manifest};
use crate::catalog::features::FeatureTable;
use crate::catalog::{Catalog, TitleLookup};
use crate::config::BuildConfig;
use crate::error::{ReelmatchError, Result};
use crate::matrix::{RatingRecord, build_rating_matrix};
use crate::reduction::{Pca, ReducedEmbedding, TruncatedSvd, reduce};
use crate::vector::Embeddings;
use crate::vector::index::{FlatIndex, FlatIndexConfig, ForestIndex};

/// A rating of an item, referenced by its external id.
pub type Rating = RatingRecord<u64, String>;

/// Everything a build consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInput {
    /// Items and their content features; also the external id ↔ title table.
    pub features: FeatureTable,
    pub ratings: Vec<Rating>,
}

/// Builds a [`Catalog`] from raw tables.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    config: BuildConfig,
}

impl CatalogBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the full build. Fails before producing anything if either table
    /// is empty.
    pub fn build(&self, input: &BuildInput) -> Result<Catalog> {
        self.config.validate()?;
        if input.ratings.is_empty() {
            return Err(ReelmatchError::empty_input("No rating records"));
        }
        input.features.validate()?;
        let items = &input.features.items;
        TitleLookup::from_items(items)?;

        let threshold = self.config.variance_threshold;

        let content = reduce(&Pca, &input.features.to_matrix(), threshold)?;
        info!("Content embedding: {} items, k1 = {}", items.len(), content.k);

        let (collaborative, rated_items) = self.collaborative_embedding(input)?;
        info!(
            "Collaborative embedding: {rated_items} of {} items rated, k2 = {}",
            items.len(),
            collaborative.k
        );

        let exact = FlatIndex::build(
            FlatIndexConfig::new(content.k),
            content.embeddings.clone(),
        )?;

        let mut forest_config = self.config.forest.clone();
        forest_config.dimension = collaborative.k;
        let approximate = ForestIndex::build_with_parallelism(
            forest_config,
            collaborative.embeddings.clone(),
            self.config.parallel_build,
        )?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            created_at: Utc::now(),
            item_count: items.len(),
            content_dimension: content.k,
            collaborative_dimension: collaborative.k,
            n_trees: approximate.n_trees(),
            variance_threshold: threshold.value(),
            content_variance_retained: content.retained_variance(),
            collaborative_variance_retained: collaborative.retained_variance(),
            rated_items,
            files: Default::default(),
        };

        Catalog::from_parts(items.clone(), exact, approximate, manifest)
    }

    /// Truncated SVD over the item × user matrix, realigned to item-index
    /// order. Items without ratings get zero rows.
    fn collaborative_embedding(&self, input: &BuildInput) -> Result<(ReducedEmbedding, usize)> {
        let items = &input.features.items;

        let mut by_external_id: AHashMap<&str, Vec<usize>> = AHashMap::new();
        for (i, item) in items.iter().enumerate() {
            by_external_id
                .entry(item.external_id.as_str())
                .or_default()
                .push(i);
        }

        let known: Vec<Rating> = input
            .ratings
            .iter()
            .filter(|r| by_external_id.contains_key(r.item.as_str()))
            .cloned()
            .collect();
        let ignored = input.ratings.len() - known.len();
        if ignored > 0 {
            warn!("Ignored {ignored} ratings referencing unknown external ids");
        }
        if known.is_empty() {
            return Err(ReelmatchError::empty_input(
                "No rating references a known item",
            ));
        }

        let ratings = build_rating_matrix(&known)?;
        debug!(
            "Rating matrix: {} users × {} items, {} entries",
            ratings.users.len(),
            ratings.items.len(),
            ratings.matrix.nnz()
        );

        let reduced = reduce(&TruncatedSvd, &ratings.matrix.transpose(), self.config.variance_threshold)?;

        let k = reduced.k;
        let mut aligned = Embeddings::zeros(items.len(), k)?;
        let mut rated_items = 0;
        for (column, external_id) in ratings.items.ids().iter().enumerate() {
            let (Some(source), Some(targets)) = (
                reduced.embeddings.row(column),
                by_external_id.get(external_id.as_str()),
            ) else {
                continue;
            };
            for &target in targets {
                if let Some(row) = aligned.row_mut(target) {
                    row.copy_from_slice(source);
                    rated_items += 1;
                }
            }
        }

        Ok((
            ReducedEmbedding {
                embeddings: aligned,
                ..reduced
            },
            rated_items,
        ))
    }
}
