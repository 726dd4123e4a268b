//! Filesystem asset store
//!
//! A location reference is the path of the finalized audio file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::{AssetError, AssetStore};
use crate::domain::catalog::LocationRef;

/// Asset store over plain files
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAssetStore;

impl FsAssetStore {
    pub fn new() -> Self {
        Self
    }

    fn io_error(location: &LocationRef, e: std::io::Error) -> AssetError {
        if e.kind() == ErrorKind::NotFound {
            AssetError::Missing(location.clone())
        } else {
            AssetError::Io(format!("{}: {}", location, e))
        }
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn exists(&self, location: &LocationRef) -> bool {
        fs::try_exists(location.as_str()).await.unwrap_or(false)
    }

    async fn remove(&self, location: &LocationRef) -> Result<(), AssetError> {
        fs::remove_file(location.as_str())
            .await
            .map_err(|e| Self::io_error(location, e))?;
        debug!(location = %location, "asset removed");
        Ok(())
    }

    async fn share(
        &self,
        location: &LocationRef,
        destination: &Path,
    ) -> Result<PathBuf, AssetError> {
        let source = Path::new(location.as_str());
        let file_name = source
            .file_name()
            .ok_or_else(|| AssetError::Io(format!("{} has no file name", location)))?;

        fs::create_dir_all(destination)
            .await
            .map_err(|e| AssetError::Io(format!("{}: {}", destination.display(), e)))?;

        let target = destination.join(file_name);
        fs::copy(source, &target)
            .await
            .map_err(|e| Self::io_error(location, e))?;

        debug!(location = %location, target = %target.display(), "asset shared");
        Ok(target)
    }
}
