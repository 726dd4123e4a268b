//! Asset store port

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::LocationRef;

/// Asset store errors
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Asset does not exist: {0}")]
    Missing(LocationRef),

    #[error("Asset I/O failed: {0}")]
    Io(String),
}

/// Port for the files behind finalized recordings
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Check whether the asset is still present
    async fn exists(&self, location: &LocationRef) -> bool;

    /// Delete the asset
    async fn remove(&self, location: &LocationRef) -> Result<(), AssetError>;

    /// Hand a copy of the asset to `destination`.
    ///
    /// # Returns
    /// Where the shared copy ended up
    async fn share(&self, location: &LocationRef, destination: &Path)
        -> Result<PathBuf, AssetError>;
}

#[async_trait]
impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    async fn exists(&self, location: &LocationRef) -> bool {
        self.as_ref().exists(location).await
    }

    async fn remove(&self, location: &LocationRef) -> Result<(), AssetError> {
        self.as_ref().remove(location).await
    }

    async fn share(
        &self,
        location: &LocationRef,
        destination: &Path,
    ) -> Result<PathBuf, AssetError> {
        self.as_ref().share(location, destination).await
    }
}
