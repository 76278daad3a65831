//! Persisted artifact sets.
//!
//! An artifact set is a directory-like group of files written through a
//! [`Storage`] backend:
//!
//! | file                     | format                           |
//! |--------------------------|----------------------------------|
//! | `exact.idx`              | flat index, little-endian binary |
//! | `approximate.idx`        | forest index, bincode            |
//! | `approximate.json`       | forest config record             |
//! | `content_embeddings.bin` | N×k1 `f32`, little-endian binary |
//! | `titles.json`            | title → item index               |
//! | `items.json`             | item index → title, external id  |
//! | `manifest.json`          | version, build id, checksums     |
//!
//! Each write stores its data files under a fresh `<write id>.<file>` name,
//! so they never collide with the files of the set being replaced. The
//! manifest is committed last by renaming a `.tmp` copy over
//! `manifest.json`; only then are the previous set's files removed. A write
//! that fails at any point leaves the previous set loadable. Loading checks
//! each file's size and CRC32 against the manifest and fails with
//! `IndexLoad` on any mismatch.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::item::ItemRecord;
use crate::catalog::{Catalog, TitleLookup};
use crate::error::{ReelmatchError, Result};
use crate::storage::Storage;
use crate::vector::Embeddings;
use crate::vector::index::io::{
    checksum, read_f32s, read_header, read_len, write_f32s, write_header, write_len,
};
use crate::vector::index::{FlatIndex, ForestIndex, ForestIndexConfig};

/// Version of the artifact set layout.
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const EXACT_INDEX_FILE: &str = "exact.idx";
pub const APPROXIMATE_INDEX_FILE: &str = "approximate.idx";
pub const APPROXIMATE_CONFIG_FILE: &str = "approximate.json";
pub const CONTENT_EMBEDDINGS_FILE: &str = "content_embeddings.bin";
pub const TITLES_FILE: &str = "titles.json";
pub const ITEMS_FILE: &str = "items.json";

const EMBEDDINGS_MAGIC: &[u8; 4] = b"RMEM";
const TMP_SUFFIX: &str = ".tmp";

/// Stored name, size and checksum of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Name on the storage backend.
    pub path: String,
    pub size: u64,
    pub crc32: u32,
}

/// Description of one build, stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    /// `k1`.
    pub content_dimension: usize,
    /// `k2`.
    pub collaborative_dimension: usize,
    pub n_trees: usize,
    pub variance_threshold: f64,
    pub content_variance_retained: f64,
    pub collaborative_variance_retained: f64,
    /// Items with at least one rating.
    pub rated_items: usize,
    /// Filled in when the set is written.
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

/// Reads and writes artifact sets on a storage backend.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    storage: Arc<dyn Storage>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Whether a complete artifact set is present.
    pub fn exists(&self) -> bool {
        self.storage.file_exists(MANIFEST_FILE)
    }

    /// Persist `catalog`. Refuses to replace an existing set unless
    /// `overwrite` is set. Returns the manifest as written.
    pub fn write(&self, catalog: &Catalog, overwrite: bool) -> Result<Manifest> {
        let previous = if self.exists() {
            if !overwrite {
                return Err(ReelmatchError::storage(
                    "An artifact set already exists; pass overwrite to replace it",
                ));
            }
            match self.read_manifest() {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    warn!("Replacing unreadable artifact set: {e}");
                    None
                }
            }
        } else {
            None
        };

        // Encode everything up front so a serialization failure writes nothing.
        let blobs = encode_blobs(catalog)?;
        let write_id = Uuid::new_v4().simple().to_string();

        let mut manifest = catalog.manifest().clone();
        manifest.files.clear();
        if let Err(e) = self.commit(&write_id, &blobs, &mut manifest) {
            self.remove_files(manifest.files.values().map(|entry| entry.path.as_str()));
            self.remove_files([tmp_name(MANIFEST_FILE).as_str()]);
            return Err(e);
        }
        self.storage.sync()?;

        if let Some(previous) = previous {
            self.remove_files(
                previous
                    .files
                    .values()
                    .map(|entry| entry.path.as_str())
                    .filter(|path| !manifest.files.values().any(|entry| entry.path == *path)),
            );
        }

        info!(
            "Wrote artifact set {} ({} files)",
            manifest.build_id,
            manifest.files.len() + 1
        );
        Ok(manifest)
    }

    /// Write every data file, then swap in the manifest that names them.
    fn commit(
        &self,
        write_id: &str,
        blobs: &[(&'static str, Vec<u8>)],
        manifest: &mut Manifest,
    ) -> Result<()> {
        for (name, bytes) in blobs {
            let path = format!("{write_id}.{name}");
            manifest.files.insert(
                name.to_string(),
                FileEntry {
                    path: path.clone(),
                    size: bytes.len() as u64,
                    crc32: checksum(bytes),
                },
            );
            self.write_bytes(&path, bytes)?;
        }

        let manifest_bytes = serde_json::to_vec_pretty(manifest)?;
        self.write_bytes(&tmp_name(MANIFEST_FILE), &manifest_bytes)?;
        self.storage.rename_file(&tmp_name(MANIFEST_FILE), MANIFEST_FILE)
    }

    fn remove_files<'a>(&self, paths: impl IntoIterator<Item = &'a str>) {
        for path in paths {
            if let Err(e) = self.storage.delete_file(path) {
                warn!("Failed to remove {path}: {e}");
            }
        }
    }

    fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut output = self.storage.create_output(path)?;
        output.write_all(bytes)?;
        output.close()?;
        debug!("Wrote {path}: {} bytes", bytes.len());
        Ok(())
    }

    /// Read only the manifest.
    pub fn read_manifest(&self) -> Result<Manifest> {
        let bytes = self
            .storage
            .read_all(MANIFEST_FILE)
            .map_err(|e| e.into_load_error(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| ReelmatchError::from(e).into_load_error(MANIFEST_FILE))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(ReelmatchError::index_load(format!(
                "Unsupported artifact format version {} (expected {FORMAT_VERSION})",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }

    /// Load and verify a complete artifact set. Every failure is
    /// `IndexLoad`.
    pub fn load(&self) -> Result<Catalog> {
        let manifest = self.read_manifest()?;

        let exact_bytes = self.read_verified(&manifest, EXACT_INDEX_FILE)?;
        let exact = FlatIndex::from_bytes(&exact_bytes)
            .map_err(|e| e.into_load_error(EXACT_INDEX_FILE))?;

        let config: ForestIndexConfig =
            self.read_json(&manifest, APPROXIMATE_CONFIG_FILE)?;
        config
            .validate()
            .map_err(|e| e.into_load_error(APPROXIMATE_CONFIG_FILE))?;

        let approximate_bytes = self.read_verified(&manifest, APPROXIMATE_INDEX_FILE)?;
        let approximate = ForestIndex::from_bytes(&approximate_bytes, &config)
            .map_err(|e| e.into_load_error(APPROXIMATE_INDEX_FILE))?;

        let embedding_bytes = self.read_verified(&manifest, CONTENT_EMBEDDINGS_FILE)?;
        let embeddings = decode_embeddings(&embedding_bytes)
            .map_err(|e| e.into_load_error(CONTENT_EMBEDDINGS_FILE))?;
        if &embeddings != exact.vectors() {
            return Err(ReelmatchError::index_load(
                "Content embeddings disagree with the exact index",
            ));
        }

        let items: Vec<ItemRecord> = self.read_json(&manifest, ITEMS_FILE)?;
        let titles: BTreeMap<String, usize> = self.read_json(&manifest, TITLES_FILE)?;
        let lookup =
            TitleLookup::from_items(&items).map_err(|e| e.into_load_error(ITEMS_FILE))?;
        if lookup.to_map() != titles {
            return Err(ReelmatchError::index_load(
                "Title table disagrees with the item table",
            ));
        }

        let build_id = manifest.build_id;
        let catalog = Catalog::from_parts(items, exact, approximate, manifest)
            .map_err(|e| e.into_load_error("artifact set"))?;
        info!(
            "Loaded artifact set {build_id}: {} items",
            catalog.len()
        );
        Ok(catalog)
    }

    fn read_verified(&self, manifest: &Manifest, name: &str) -> Result<Vec<u8>> {
        let entry = manifest.files.get(name).ok_or_else(|| {
            ReelmatchError::index_load(format!("{name}: not listed in manifest"))
        })?;
        let bytes = self
            .storage
            .read_all(&entry.path)
            .map_err(|e| e.into_load_error(name))?;

        if bytes.len() as u64 != entry.size {
            return Err(ReelmatchError::index_load(format!(
                "{name}: size {} does not match manifest ({})",
                bytes.len(),
                entry.size
            )));
        }
        let crc32 = checksum(&bytes);
        if crc32 != entry.crc32 {
            return Err(ReelmatchError::index_load(format!(
                "{name}: checksum {crc32:08x} does not match manifest ({:08x})",
                entry.crc32
            )));
        }
        Ok(bytes)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, manifest: &Manifest, name: &str) -> Result<T> {
        let bytes = self.read_verified(manifest, name)?;
        serde_json::from_slice(&bytes).map_err(|e| ReelmatchError::from(e).into_load_error(name))
    }
}

fn tmp_name(name: &str) -> String {
    format!("{name}{TMP_SUFFIX}")
}

fn encode_blobs(catalog: &Catalog) -> Result<Vec<(&'static str, Vec<u8>)>> {
    Ok(vec![
        (EXACT_INDEX_FILE, catalog.exact_index().to_bytes()?),
        (APPROXIMATE_INDEX_FILE, catalog.approximate_index().to_bytes()?),
        (
            APPROXIMATE_CONFIG_FILE,
            serde_json::to_vec_pretty(catalog.approximate_index().config())?,
        ),
        (
            CONTENT_EMBEDDINGS_FILE,
            encode_embeddings(catalog.content_embeddings())?,
        ),
        (TITLES_FILE, serde_json::to_vec(&catalog.lookup().to_map())?),
        (ITEMS_FILE, serde_json::to_vec(catalog.items())?),
    ])
}

fn encode_embeddings(embeddings: &Embeddings) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(24 + embeddings.as_flat().len() * 4);
    write_header(&mut buffer, EMBEDDINGS_MAGIC, FORMAT_VERSION)?;
    write_len(&mut buffer, embeddings.len())?;
    write_len(&mut buffer, embeddings.dimension())?;
    write_f32s(&mut buffer, embeddings.as_flat())?;
    Ok(buffer)
}

fn decode_embeddings(bytes: &[u8]) -> Result<Embeddings> {
    let mut input = Cursor::new(bytes);
    read_header(&mut input, EMBEDDINGS_MAGIC, FORMAT_VERSION)?;
    let max_values = bytes.len() / 4;
    let rows = read_len(&mut input, max_values)?;
    let dimension = read_len(&mut input, max_values)?;
    let count = rows
        .checked_mul(dimension)
        .filter(|&count| count <= max_values)
        .ok_or_else(|| ReelmatchError::index_load("Embedding shape exceeds blob size"))?;
    let data = read_f32s(&mut input, count)?;
    if input.position() as usize != bytes.len() {
        return Err(ReelmatchError::index_load("Trailing bytes after embeddings"));
    }
    Embeddings::from_flat(dimension, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::catalog::builder::{BuildInput, CatalogBuilder, Rating};
    use crate::catalog::features::{FeatureEncoder, MovieRecord};
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{StorageInput, StorageOutput};

    /// Memory storage whose renames can be made to fail.
    #[derive(Debug, Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_renames: AtomicBool,
    }

    impl Storage for FlakyStorage {
        fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
            self.inner.open_input(name)
        }
        fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
            self.inner.create_output(name)
        }
        fn file_exists(&self, name: &str) -> bool {
            self.inner.file_exists(name)
        }
        fn delete_file(&self, name: &str) -> Result<()> {
            self.inner.delete_file(name)
        }
        fn list_files(&self) -> Result<Vec<String>> {
            self.inner.list_files()
        }
        fn file_size(&self, name: &str) -> Result<u64> {
            self.inner.file_size(name)
        }
        fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
            if self.fail_renames.load(Ordering::SeqCst) {
                return Err(ReelmatchError::storage("rename refused"));
            }
            self.inner.rename_file(old_name, new_name)
        }
        fn sync(&self) -> Result<()> {
            self.inner.sync()
        }
    }

    fn catalog(genre: &str) -> Catalog {
        let movies: Vec<MovieRecord> = ["A (1990)", "B (1991)", "C (2005)"]
            .iter()
            .enumerate()
            .map(|(i, title)| MovieRecord::from_raw(title, &i.to_string(), genre))
            .collect();
        let input = BuildInput {
            features: FeatureEncoder.encode(&movies).unwrap(),
            ratings: vec![
                Rating::new(1, "0".into(), 4.0),
                Rating::new(1, "1".into(), 2.0),
                Rating::new(2, "2".into(), 5.0),
            ],
        };
        CatalogBuilder::default().build(&input).unwrap()
    }

    #[test]
    fn test_failed_overwrite_keeps_previous_set() {
        let storage = Arc::new(FlakyStorage::default());
        let store = ArtifactStore::new(storage.clone());

        let first = store.write(&catalog("Drama"), false).unwrap();
        let files_before = storage.list_files().unwrap();

        storage.fail_renames.store(true, Ordering::SeqCst);
        assert!(store.write(&catalog("Comedy|Drama"), true).is_err());
        storage.fail_renames.store(false, Ordering::SeqCst);

        assert_eq!(storage.list_files().unwrap(), files_before);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.manifest().build_id, first.build_id);
    }

    #[test]
    fn test_overwrite_removes_previous_files() {
        let storage = Arc::new(MemoryStorage::new_default());
        let store = ArtifactStore::new(storage.clone());

        let first = store.write(&catalog("Drama"), false).unwrap();
        let second = store.write(&catalog("Drama"), true).unwrap();

        let files = storage.list_files().unwrap();
        assert_eq!(files.len(), second.files.len() + 1);
        for entry in first.files.values() {
            assert!(!storage.file_exists(&entry.path));
        }
        for entry in second.files.values() {
            assert!(storage.file_exists(&entry.path));
        }
        assert_eq!(store.load().unwrap().manifest().build_id, second.build_id);
    }

    #[test]
    fn test_embeddings_blob_round_trip() {
        let embeddings = Embeddings::from_rows(&[vec![1.0, -2.5], vec![0.0, 3.25]]).unwrap();
        let bytes = encode_embeddings(&embeddings).unwrap();
        assert_eq!(decode_embeddings(&bytes).unwrap(), embeddings);

        let mut bad = bytes.clone();
        bad.pop();
        assert!(decode_embeddings(&bad).is_err());
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            build_id: Uuid::nil(),
            created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            item_count: 3,
            content_dimension: 2,
            collaborative_dimension: 1,
            n_trees: 20,
            variance_threshold: 0.95,
            content_variance_retained: 1.0,
            collaborative_variance_retained: 0.97,
            rated_items: 3,
            files: BTreeMap::new(),
        };
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["build_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");

        let back: Manifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, manifest);
    }
}
