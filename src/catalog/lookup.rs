//! Title lookup table.

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::catalog::item::ItemRecord;
use crate::error::{ReelmatchError, Result};
use crate::util::levenshtein::levenshtein_similarity;

/// Minimum similarity for a title to be offered as a suggestion.
pub const SUGGESTION_CUTOFF: f64 = 0.7;

/// Exact title → item index mapping. A bijection over one build's items.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleLookup {
    index: AHashMap<String, usize>,
    titles: Vec<String>,
}

impl TitleLookup {
    /// Index `items` by title. Duplicate titles are rejected.
    pub fn from_items(items: &[ItemRecord]) -> Result<Self> {
        let mut index = AHashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if let Some(previous) = index.insert(item.title.clone(), i) {
                return Err(ReelmatchError::invalid_input(format!(
                    "Duplicate title {:?} at items {previous} and {i}",
                    item.title
                )));
            }
        }
        Ok(Self {
            index,
            titles: items.iter().map(|item| item.title.clone()).collect(),
        })
    }

    /// Item index of `title`, exact match only.
    pub fn get(&self, title: &str) -> Option<usize> {
        self.index.get(title).copied()
    }

    /// Like [`TitleLookup::get`], failing with `UnknownTitle`.
    pub fn resolve(&self, title: &str) -> Result<usize> {
        self.get(title)
            .ok_or_else(|| ReelmatchError::unknown_title(title))
    }

    pub fn title_of(&self, item: usize) -> Option<&str> {
        self.titles.get(item).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Sorted persistent form.
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.index
            .iter()
            .map(|(title, &i)| (title.clone(), i))
            .collect()
    }

    /// Known titles similar to `query`, best first (ties by title).
    ///
    /// Comparison is case-insensitive; only titles scoring at least
    /// [`SUGGESTION_CUTOFF`] are returned.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<(String, f64)> {
        let query = query.to_lowercase();
        let mut scored: Vec<(String, f64)> = self
            .titles
            .iter()
            .filter_map(|title| {
                let score = levenshtein_similarity(&query, &title.to_lowercase());
                (score >= SUGGESTION_CUTOFF).then(|| (title.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }
}
