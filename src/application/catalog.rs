//! Recordings catalog service
//!
//! Keeps the in-memory catalog and its persisted copy in step. Mutations are
//! staged on a copy, persisted, and only then committed, so a failed write
//! leaves the visible catalog exactly as it was.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::domain::catalog::{Catalog, Filter, LocationRef, RecordingRecord};
use crate::domain::error::{CatalogDecodeError, CatalogViolation};

use super::ports::{AssetError, AssetStore, KeyValueStore, StorageError};

/// Storage key the catalog is persisted under
pub const CATALOG_KEY: &str = "recordings";

/// Errors from catalog operations
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Saved recordings list is corrupt and was reset: {0}")]
    CorruptCatalog(String),

    #[error("Saved recordings list was written by a newer version and is left untouched: {0}")]
    UnsupportedSchema(String),

    #[error("A recording for {0} already exists")]
    DuplicateAsset(LocationRef),

    #[error("No recording found for {0}")]
    NotFound(LocationRef),

    #[error("Recording file does not exist: {0}")]
    AssetMissing(LocationRef),

    #[error("Failed to share recording: {0}")]
    ShareFailed(String),
}

impl From<StorageError> for CatalogError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unavailable(msg) => Self::StorageUnavailable(msg),
        }
    }
}

impl From<CatalogViolation> for CatalogError {
    fn from(v: CatalogViolation) -> Self {
        match v {
            CatalogViolation::DuplicateAsset(location) => Self::DuplicateAsset(location),
            CatalogViolation::NotFound(location) => Self::NotFound(location),
        }
    }
}

/// Search results over a point-in-time snapshot of the catalog.
///
/// Each call to [`FilteredRecordings::iter`] starts a fresh pass.
#[derive(Debug, Clone)]
pub struct FilteredRecordings {
    snapshot: Arc<Catalog>,
    query: String,
}

impl FilteredRecordings {
    pub fn iter(&self) -> Filter<'_> {
        self.snapshot.filter(&self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Collect matches into owned records
    pub fn to_vec(&self) -> Vec<RecordingRecord> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a FilteredRecordings {
    type Item = &'a RecordingRecord;
    type IntoIter = Filter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Catalog service over a key-value store and the asset files
pub struct RecordingsCatalog<S, A>
where
    S: KeyValueStore,
    A: AssetStore,
{
    store: S,
    assets: A,
    committed: RwLock<Arc<Catalog>>,
    /// Serializes mutations. Holds the reason writes are refused while the
    /// stored copy could not be read into `committed`.
    write_lock: Mutex<Option<CatalogError>>,
}

impl<S, A> RecordingsCatalog<S, A>
where
    S: KeyValueStore,
    A: AssetStore,
{
    /// Create an empty catalog. Call [`RecordingsCatalog::load`] to read the stored copy.
    pub fn new(store: S, assets: A) -> Self {
        Self {
            store,
            assets,
            committed: RwLock::new(Arc::new(Catalog::new())),
            write_lock: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// Read the persisted catalog.
    ///
    /// A missing catalog loads as empty. A corrupt document is replaced by an
    /// empty catalog that later mutations overwrite. When the stored copy
    /// cannot be read, or was written in a newer schema, the catalog shows
    /// empty and refuses mutations until a later `load` succeeds, so the
    /// stored records are never written over.
    pub async fn load(&self) -> Result<usize, CatalogError> {
        let mut blocked = self.write_lock.lock().await;

        let bytes = match self.store.get(CATALOG_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                *blocked = None;
                self.commit(Catalog::new());
                return Ok(0);
            }
            Err(e) => {
                warn!(error = %e, "could not read recordings catalog, changes disabled");
                let err = CatalogError::from(e);
                *blocked = Some(err.clone());
                self.commit(Catalog::new());
                return Err(err);
            }
        };

        match Catalog::decode(&bytes) {
            Ok(decoded) => {
                if decoded.needs_upgrade() {
                    info!(
                        from = decoded.schema_version,
                        "catalog will be upgraded on next save"
                    );
                }
                let count = decoded.catalog.len();
                *blocked = None;
                self.commit(decoded.catalog);
                info!(count, "recordings catalog loaded");
                Ok(count)
            }
            Err(e @ CatalogDecodeError::UnsupportedVersion { .. }) => {
                warn!(error = %e, "recordings catalog uses a newer schema, changes disabled");
                let err = CatalogError::UnsupportedSchema(e.to_string());
                *blocked = Some(err.clone());
                self.commit(Catalog::new());
                Err(err)
            }
            Err(e) => {
                warn!(error = %e, "recordings catalog is corrupt, starting empty");
                *blocked = None;
                self.commit(Catalog::new());
                Err(CatalogError::CorruptCatalog(e.to_string()))
            }
        }
    }

    /// Current committed catalog
    pub fn snapshot(&self) -> Arc<Catalog> {
        let committed = self.committed.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&committed)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn get(&self, location: &LocationRef) -> Option<RecordingRecord> {
        self.snapshot().get(location).cloned()
    }

    /// Records whose name contains `query`, ignoring case. Pure read.
    pub fn filter(&self, query: &str) -> FilteredRecordings {
        FilteredRecordings {
            snapshot: self.snapshot(),
            query: query.to_string(),
        }
    }

    /// Add a record at the end and persist. All or nothing.
    pub async fn append(&self, record: RecordingRecord) -> Result<(), CatalogError> {
        let _write = self.writable().await?;

        let location = record.location_ref.clone();
        let mut next = Catalog::clone(&self.snapshot());
        next.append(record)?;
        self.persist(&next).await?;
        self.commit(next);

        info!(location = %location, "recording added to catalog");
        Ok(())
    }

    /// Change a record's display name and persist. All or nothing.
    pub async fn rename(
        &self,
        location: &LocationRef,
        new_name: impl Into<String>,
    ) -> Result<(), CatalogError> {
        let _write = self.writable().await?;

        let mut next = Catalog::clone(&self.snapshot());
        next.rename(location, new_name)?;
        self.persist(&next).await?;
        self.commit(next);

        info!(location = %location, "recording renamed");
        Ok(())
    }

    /// Remove a record, persist, then delete its asset.
    ///
    /// Once the removal is persisted it stands: a failure to delete the asset
    /// only leaves an orphaned file behind and is logged, not returned.
    pub async fn delete(&self, location: &LocationRef) -> Result<RecordingRecord, CatalogError> {
        let removed = {
            let _write = self.writable().await?;

            let mut next = Catalog::clone(&self.snapshot());
            let removed = next.remove(location)?;
            self.persist(&next).await?;
            self.commit(next);
            removed
        };
        info!(location = %location, "recording removed from catalog");

        if let Err(e) = self.assets.remove(location).await {
            warn!(location = %location, error = %e, "orphaned recording asset left behind");
        }

        Ok(removed)
    }

    /// Hand a copy of a recording's asset to `destination`
    pub async fn share(
        &self,
        location: &LocationRef,
        destination: &Path,
    ) -> Result<PathBuf, CatalogError> {
        if self.get(location).is_none() {
            return Err(CatalogError::NotFound(location.clone()));
        }
        if !self.assets.exists(location).await {
            return Err(CatalogError::AssetMissing(location.clone()));
        }

        self.assets
            .share(location, destination)
            .await
            .map_err(|e| match e {
                AssetError::Missing(location) => CatalogError::AssetMissing(location),
                AssetError::Io(msg) => CatalogError::ShareFailed(msg),
            })
    }

    /// Take the write lock, unless the last load left the stored copy unread
    async fn writable(&self) -> Result<MutexGuard<'_, Option<CatalogError>>, CatalogError> {
        let guard = self.write_lock.lock().await;
        if let Some(reason) = guard.as_ref() {
            return Err(reason.clone());
        }
        Ok(guard)
    }

    async fn persist(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        let bytes = catalog
            .encode()
            .map_err(|e| CatalogError::StorageUnavailable(e.to_string()))?;
        self.store.set(CATALOG_KEY, &bytes).await.map_err(|e| {
            warn!(error = %e, "failed to persist recordings catalog");
            CatalogError::from(e)
        })
    }

    fn commit(&self, catalog: Catalog) {
        let mut committed = self.committed.write().unwrap_or_else(|e| e.into_inner());
        *committed = Arc::new(catalog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockStore {
        entries: StdMutex<HashMap<String, Vec<u8>>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MockStore {
        fn with_raw(raw: &[u8]) -> Self {
            let store = Self::default();
            store
                .entries
                .lock()
                .unwrap()
                .insert(CATALOG_KEY.to_string(), raw.to_vec());
            store
        }

        fn raw(&self) -> Option<Vec<u8>> {
            self.entries.lock().unwrap().get(CATALOG_KEY).cloned()
        }
    }

    #[async_trait]
    impl KeyValueStore for MockStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("disk gone".to_string()));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            tokio::task::yield_now().await;
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("disk full".to_string()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAssets {
        removed: StdMutex<Vec<LocationRef>>,
        missing: AtomicBool,
        fail_remove: AtomicBool,
    }

    #[async_trait]
    impl AssetStore for MockAssets {
        async fn exists(&self, _location: &LocationRef) -> bool {
            !self.missing.load(Ordering::SeqCst)
        }

        async fn remove(&self, location: &LocationRef) -> Result<(), AssetError> {
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(AssetError::Io("permission denied".to_string()));
            }
            self.removed.lock().unwrap().push(location.clone());
            Ok(())
        }

        async fn share(
            &self,
            location: &LocationRef,
            destination: &Path,
        ) -> Result<PathBuf, AssetError> {
            Ok(destination.join(location.as_str()))
        }
    }

    fn record(location: &str, name: &str) -> RecordingRecord {
        RecordingRecord::new(
            location.into(),
            Some(name.to_string()),
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        )
    }

    fn catalog() -> RecordingsCatalog<MockStore, MockAssets> {
        RecordingsCatalog::new(MockStore::default(), MockAssets::default())
    }

    fn names(results: &FilteredRecordings) -> Vec<String> {
        results.iter().map(|r| r.location_ref.to_string()).collect()
    }

    #[tokio::test]
    async fn load_missing_catalog_is_empty() {
        let catalog = catalog();
        assert_eq!(catalog.load().await.unwrap(), 0);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_catalog_resets_to_empty() {
        let catalog = RecordingsCatalog::new(
            MockStore::with_raw(br#"[{"uri": "a.m4a"}]"#),
            MockAssets::default(),
        );
        assert!(matches!(
            catalog.load().await,
            Err(CatalogError::CorruptCatalog(_))
        ));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn load_storage_failure_is_surfaced() {
        let catalog = catalog();
        catalog.store().fail_reads.store(true, Ordering::SeqCst);
        assert!(matches!(
            catalog.load().await,
            Err(CatalogError::StorageUnavailable(_))
        ));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn unread_catalog_refuses_changes_until_reloaded() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        catalog.append(record("b", "Two")).await.unwrap();
        catalog.append(record("c", "Three")).await.unwrap();
        let stored = catalog.store().raw().unwrap();

        catalog.store().fail_reads.store(true, Ordering::SeqCst);
        assert!(matches!(
            catalog.load().await,
            Err(CatalogError::StorageUnavailable(_))
        ));
        assert!(matches!(
            catalog.append(record("d", "Four")).await,
            Err(CatalogError::StorageUnavailable(_))
        ));
        assert!(catalog.rename(&"a".into(), "x").await.is_err());
        assert!(catalog.delete(&"b".into()).await.is_err());
        assert_eq!(catalog.store().raw().unwrap(), stored);
        assert!(catalog.assets().removed.lock().unwrap().is_empty());

        catalog.store().fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(catalog.load().await.unwrap(), 3);
        catalog.append(record("d", "Four")).await.unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[tokio::test]
    async fn newer_schema_is_never_overwritten() {
        let newer = br#"{"version":7,"recordings":[],"tags":["x"]}"#;
        let catalog = RecordingsCatalog::new(MockStore::with_raw(newer), MockAssets::default());

        assert!(matches!(
            catalog.load().await,
            Err(CatalogError::UnsupportedSchema(_))
        ));
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.append(record("a", "One")).await,
            Err(CatalogError::UnsupportedSchema(_))
        ));
        assert_eq!(catalog.store().raw().unwrap(), newer.to_vec());
    }

    #[tokio::test]
    async fn corrupt_catalog_accepts_new_records() {
        let catalog = RecordingsCatalog::new(MockStore::with_raw(b"not json"), MockAssets::default());
        assert!(catalog.load().await.is_err());

        catalog.append(record("a", "One")).await.unwrap();
        let stored = Catalog::decode(&catalog.store().raw().unwrap()).unwrap();
        assert_eq!(stored.catalog.len(), 1);
    }

    #[tokio::test]
    async fn append_then_filter_contains_record_once() {
        let catalog = catalog();
        catalog.load().await.unwrap();
        catalog.append(record("a.m4a", "Voice memo")).await.unwrap();

        let all = catalog.filter("");
        assert_eq!(names(&all), vec!["a.m4a"]);
        assert_eq!(names(&catalog.filter("voice")), vec!["a.m4a"]);
        assert_eq!(names(&catalog.filter("VOICE")), vec!["a.m4a"]);
        assert!(names(&catalog.filter("xyz")).is_empty());
    }

    #[tokio::test]
    async fn append_persists_and_reloads_equal() {
        let first = catalog();
        first.append(record("a", "One")).await.unwrap();
        first.append(record("b", "Two")).await.unwrap();

        let raw = first.store().raw().unwrap();
        let second = RecordingsCatalog::new(MockStore::with_raw(&raw), MockAssets::default());
        assert_eq!(second.load().await.unwrap(), 2);
        assert_eq!(*second.snapshot(), *first.snapshot());
    }

    #[tokio::test]
    async fn append_duplicate_is_rejected() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        assert!(matches!(
            catalog.append(record("a", "Again")).await,
            Err(CatalogError::DuplicateAsset(_))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn failed_append_rolls_back() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        let before = catalog.len();

        catalog.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            catalog.append(record("b", "Two")).await,
            Err(CatalogError::StorageUnavailable(_))
        ));
        assert_eq!(catalog.len(), before);
        assert!(catalog.get(&"b".into()).is_none());
    }

    #[tokio::test]
    async fn rename_updates_search_results() {
        let catalog = catalog();
        catalog.append(record("a", "Lecture notes")).await.unwrap();
        catalog.rename(&"a".into(), "Podcast").await.unwrap();

        assert_eq!(names(&catalog.filter("podcast")), vec!["a"]);
        assert!(names(&catalog.filter("lecture")).is_empty());
    }

    #[tokio::test]
    async fn failed_rename_rolls_back() {
        let catalog = catalog();
        catalog.append(record("a", "Original")).await.unwrap();
        catalog.store().fail_writes.store(true, Ordering::SeqCst);

        assert!(catalog.rename(&"a".into(), "Changed").await.is_err());
        assert_eq!(catalog.get(&"a".into()).unwrap().display_name, "Original");
    }

    #[tokio::test]
    async fn rename_missing_is_not_found() {
        let catalog = catalog();
        assert!(matches!(
            catalog.rename(&"ghost".into(), "x").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_record_and_asset() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        catalog.append(record("b", "Two")).await.unwrap();

        let removed = catalog.delete(&"a".into()).await.unwrap();
        assert_eq!(removed.display_name, "One");
        assert_eq!(names(&catalog.filter("")), vec!["b"]);
        assert_eq!(
            *catalog.assets().removed.lock().unwrap(),
            vec![LocationRef::from("a")]
        );
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        catalog.delete(&"a".into()).await.unwrap();

        assert!(matches!(
            catalog.delete(&"a".into()).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn delete_survives_asset_failure() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        catalog.assets().fail_remove.store(true, Ordering::SeqCst);

        assert!(catalog.delete(&"a".into()).await.is_ok());
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn delete_with_storage_failure_keeps_record() {
        let catalog = catalog();
        catalog.append(record("a", "One")).await.unwrap();
        catalog.store().fail_writes.store(true, Ordering::SeqCst);

        assert!(matches!(
            catalog.delete(&"a".into()).await,
            Err(CatalogError::StorageUnavailable(_))
        ));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.assets().removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_reads_a_snapshot() {
        let catalog = catalog();
        catalog.append(record("a", "Memo one")).await.unwrap();

        let results = catalog.filter("memo");
        catalog.append(record("b", "Memo two")).await.unwrap();

        assert_eq!(names(&results), vec!["a"]);
        assert_eq!(names(&catalog.filter("memo")), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn concurrent_mutations_are_serialized() {
        let catalog = catalog();
        let (first, second, third) = tokio::join!(
            catalog.append(record("a", "One")),
            catalog.append(record("b", "Two")),
            catalog.append(record("c", "Three")),
        );
        assert!(first.is_ok() && second.is_ok() && third.is_ok());

        let stored = Catalog::decode(&catalog.store().raw().unwrap()).unwrap();
        assert_eq!(stored.catalog.len(), 3);
        assert_eq!(stored.catalog, *catalog.snapshot());
    }

    #[tokio::test]
    async fn share_checks_record_and_asset() {
        let catalog = catalog();
        let dest = Path::new("/tmp/out");
        assert!(matches!(
            catalog.share(&"a".into(), dest).await,
            Err(CatalogError::NotFound(_))
        ));

        catalog.append(record("a", "One")).await.unwrap();
        assert_eq!(
            catalog.share(&"a".into(), dest).await.unwrap(),
            dest.join("a")
        );

        catalog.assets().missing.store(true, Ordering::SeqCst);
        assert!(matches!(
            catalog.share(&"a".into(), dest).await,
            Err(CatalogError::AssetMissing(_))
        ));
    }

    #[tokio::test]
    async fn legacy_catalog_is_upgraded_on_next_save() {
        let legacy = br#"[{"uri": "old.m4a", "name": "Old", "date": "2023-12-24T18:00:00.000Z"}]"#;
        let catalog = RecordingsCatalog::new(MockStore::with_raw(legacy), MockAssets::default());
        assert_eq!(catalog.load().await.unwrap(), 1);

        catalog.append(record("new.flac", "New")).await.unwrap();
        let stored: serde_json::Value =
            serde_json::from_slice(&catalog.store().raw().unwrap()).unwrap();
        assert_eq!(stored["version"], 1);
        assert_eq!(stored["recordings"][0]["location_ref"], "old.m4a");
        assert_eq!(stored["recordings"][1]["location_ref"], "new.flac");
    }
}
