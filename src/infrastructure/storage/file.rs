//! File-backed key-value store
//!
//! Each key is one JSON file under the store root. Writes go to a sibling
//! temp file which is then renamed over the target, so a crash mid-write
//! leaves the previous value intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::{KeyValueStore, StorageError};

/// Key-value store over a directory of `<key>.json` files
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the value for `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && !key.contains("..");
        if !valid {
            return Err(StorageError::Unavailable(format!(
                "invalid storage key: {:?}",
                key
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Unavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let unavailable = |e: std::io::Error| {
            StorageError::Unavailable(format!("{}: {}", path.display(), e))
        };

        fs::create_dir_all(&self.root).await.map_err(unavailable)?;

        let temp = self.root.join(format!(".{}.json.tmp", key));
        fs::write(&temp, value).await.map_err(unavailable)?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(unavailable(e));
        }

        debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        assert_eq!(store.get("recordings").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested/store"));

        store.set("recordings", b"[1,2]").await.unwrap();
        store.set("recordings", b"[3]").await.unwrap();

        assert_eq!(store.get("recordings").await.unwrap(), Some(b"[3]".to_vec()));
        assert!(store.root().join("recordings.json").exists());
        assert!(!store.root().join(".recordings.json.tmp").exists());
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = FileKeyValueStore::new("/tmp/kv");
        for key in ["", "../escape", "a/b", "a\\b", ".hidden"] {
            assert!(store.path_for(key).is_err(), "accepted {:?}", key);
        }
        assert_eq!(
            store.path_for("recordings").unwrap(),
            PathBuf::from("/tmp/kv/recordings.json")
        );
    }

    #[tokio::test]
    async fn unreadable_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = FileKeyValueStore::new(&blocker);
        assert!(matches!(
            store.set("recordings", b"[]").await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
