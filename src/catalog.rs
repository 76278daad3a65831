//! The item catalog: everything the serving phase needs, in one value.
//!
//! A [`Catalog`] is produced by [`builder::CatalogBuilder`] or loaded from an
//! artifact set by [`artifacts::ArtifactStore`]. It is immutable; share it
//! across request handlers as `Arc<Catalog>`.

pub mod artifacts;
pub mod builder;
pub mod features;
pub mod item;
pub mod lookup;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReelmatchError, Result};
use crate::vector::Embeddings;
use crate::vector::index::{FlatIndex, ForestIndex, IndexKind, IndexStats, NeighborIndex};

pub use self::artifacts::{ArtifactStore, Manifest};
pub use self::builder::{BuildInput, CatalogBuilder};
pub use self::features::{FeatureEncoder, FeatureTable, MovieRecord};
pub use self::item::ItemRecord;
pub use self::lookup::TitleLookup;

/// Read-only serving state: items, title lookup and both indexes.
#[derive(Debug)]
pub struct Catalog {
    items: Vec<ItemRecord>,
    lookup: TitleLookup,
    exact: FlatIndex,
    approximate: ForestIndex,
    manifest: Manifest,
}

/// Summary of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub item_count: usize,
    pub content_dimension: usize,
    pub collaborative_dimension: usize,
    pub n_trees: usize,
    pub rated_items: usize,
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub exact: IndexStats,
    pub approximate: IndexStats,
}

impl Catalog {
    /// Assemble a catalog, checking that every part describes the same
    /// item set.
    pub fn from_parts(
        items: Vec<ItemRecord>,
        exact: FlatIndex,
        approximate: ForestIndex,
        manifest: Manifest,
    ) -> Result<Self> {
        let lookup = TitleLookup::from_items(&items)?;

        let n = items.len();
        if exact.len() != n || approximate.len() != n || manifest.item_count != n {
            return Err(ReelmatchError::invalid_input(format!(
                "Item count mismatch: {n} items, exact index {}, approximate index {}, manifest {}",
                exact.len(),
                approximate.len(),
                manifest.item_count
            )));
        }
        if exact.dimension() != manifest.content_dimension
            || approximate.dimension() != manifest.collaborative_dimension
        {
            return Err(ReelmatchError::invalid_input(format!(
                "Dimension mismatch: exact {} vs {}, approximate {} vs {}",
                exact.dimension(),
                manifest.content_dimension,
                approximate.dimension(),
                manifest.collaborative_dimension
            )));
        }

        Ok(Self {
            items,
            lookup,
            exact,
            approximate,
            manifest,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&ItemRecord> {
        self.items.get(index)
    }

    pub fn lookup(&self) -> &TitleLookup {
        &self.lookup
    }

    /// Reduced content embeddings, row `i` for item `i`.
    pub fn content_embeddings(&self) -> &Embeddings {
        self.exact.vectors()
    }

    pub fn exact_index(&self) -> &FlatIndex {
        &self.exact
    }

    pub fn approximate_index(&self) -> &ForestIndex {
        &self.approximate
    }

    /// The index answering queries for `kind`.
    pub fn index(&self, kind: IndexKind) -> &dyn NeighborIndex {
        match kind {
            IndexKind::Flat => &self.exact,
            IndexKind::Forest => &self.approximate,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn stats(&self) -> CatalogStats {
        let exact = self.exact.stats();
        let approximate = self.approximate.stats();
        CatalogStats {
            item_count: self.items.len(),
            content_dimension: exact.dimension,
            collaborative_dimension: approximate.dimension,
            n_trees: approximate.n_trees.unwrap_or(0),
            rated_items: self.manifest.rated_items,
            build_id: self.manifest.build_id,
            created_at: self.manifest.created_at,
            exact,
            approximate,
        }
    }
}
