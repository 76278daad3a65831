//! Query-time recommendation engine.

use std::sync::Arc;

use log::debug;

use crate::catalog::Catalog;
use crate::error::{ReelmatchError, Result};
use crate::recommend::request::{ModelChoice, Recommendation, RecommendationRequest};

/// Answers recommendation requests against one shared catalog.
///
/// Cheap to clone; every clone reads the same `Arc<Catalog>`. Requests never
/// mutate anything, so any number may run concurrently.
#[derive(Debug, Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
}

impl Recommender {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Items most similar to the requested title, excluding the title
    /// itself, in the selected index's order.
    ///
    /// Returns `min(n, N - 1)` items for a known title.
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<Vec<Recommendation>> {
        request.validate()?;
        let n = request.n_recommendations;
        let item = self.catalog.lookup().resolve(&request.title)?;

        let index = self.catalog.index(request.model.index_kind());
        let mut neighbors = index.neighbors_of(item, n.saturating_add(1))?;

        // Only the literal query item; equal-distance duplicates stay.
        if let Some(position) = neighbors.iter().position(|neighbor| neighbor.item == item) {
            neighbors.remove(position);
        }
        neighbors.truncate(n);

        debug!(
            "{} neighbors of {:?} (item {item}) via {}",
            neighbors.len(),
            request.title,
            request.model
        );

        neighbors
            .into_iter()
            .map(|neighbor| {
                let record = self.catalog.item(neighbor.item).ok_or_else(|| {
                    ReelmatchError::index(format!("Index returned unknown item {}", neighbor.item))
                })?;
                Ok(Recommendation {
                    item: neighbor.item,
                    title: record.title.clone(),
                    external_id: record.external_id.clone(),
                })
            })
            .collect()
    }

    /// Shorthand for [`Recommender::recommend`].
    pub fn recommend_title(
        &self,
        title: &str,
        model: ModelChoice,
        n_recommendations: usize,
    ) -> Result<Vec<Recommendation>> {
        self.recommend(&RecommendationRequest::new(model, n_recommendations, title))
    }
}
