//! Record-and-save use case
//!
//! Ties the session controller to the catalog: a stopped session's asset is
//! named and appended as a new recording.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::catalog::{LocationRef, RecordingRecord};
use crate::domain::session::Transition;

use super::catalog::{CatalogError, RecordingsCatalog};
use super::ports::{AssetStore, CaptureDevice, KeyValueStore};
use super::session::{PermissionStatus, SessionController, SessionError, SessionSnapshot};

/// Errors from the recorder use case
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The asset was finalized but its record could not be persisted.
    /// The record is handed back so the save can be retried.
    #[error("Recording was finalized but not added to the list: {source}")]
    Save {
        record: RecordingRecord,
        #[source]
        source: CatalogError,
    },
}

/// Outcome of [`RecorderUseCase::initialize`]
#[derive(Debug)]
pub struct StartupReport {
    pub permission: PermissionStatus,
    /// Number of recordings loaded, or why the list started empty
    pub catalog: Result<usize, CatalogError>,
}

/// A recording that was stopped and added to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecording {
    pub record: RecordingRecord,
    pub elapsed_seconds: u64,
}

/// Recorder: one session controller plus the recordings catalog
pub struct RecorderUseCase<D, S, A>
where
    D: CaptureDevice,
    S: KeyValueStore,
    A: AssetStore,
{
    session: SessionController<D>,
    catalog: RecordingsCatalog<S, A>,
}

impl<D, S, A> RecorderUseCase<D, S, A>
where
    D: CaptureDevice,
    S: KeyValueStore,
    A: AssetStore,
{
    pub fn new(session: SessionController<D>, catalog: RecordingsCatalog<S, A>) -> Self {
        Self { session, catalog }
    }

    pub fn session(&self) -> &SessionController<D> {
        &self.session
    }

    pub fn catalog(&self) -> &RecordingsCatalog<S, A> {
        &self.catalog
    }

    /// Ask for microphone access and load the saved recordings.
    ///
    /// Neither failure is fatal: a denied permission only blocks recording,
    /// and an unreadable catalog starts empty.
    pub async fn initialize(&self) -> StartupReport {
        let permission = match self.session.request_permission().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "permission request failed");
                self.session.permission()
            }
        };
        let catalog = self.catalog.load().await;

        StartupReport {
            permission,
            catalog,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub async fn start(&self, name: Option<String>) -> Result<(), RecorderError> {
        Ok(self.session.start(name).await?)
    }

    pub async fn pause(&self) -> Result<Transition, RecorderError> {
        Ok(self.session.pause().await?)
    }

    pub async fn resume(&self) -> Result<Transition, RecorderError> {
        Ok(self.session.resume().await?)
    }

    /// Stop the session and add its asset to the catalog.
    ///
    /// The record is named from the label given at start, or from the
    /// moment it is saved when no label was given.
    pub async fn stop_and_save(&self) -> Result<SavedRecording, RecorderError> {
        let finished = self.session.stop().await?;
        let record = RecordingRecord::new(finished.location_ref, finished.pending_name, Utc::now());

        self.save(record.clone())
            .await
            .map(|()| SavedRecording {
                record,
                elapsed_seconds: finished.elapsed_seconds,
            })
    }

    /// Append a record, typically one handed back by [`RecorderError::Save`]
    pub async fn save(&self, record: RecordingRecord) -> Result<(), RecorderError> {
        match self.catalog.append(record.clone()).await {
            Ok(()) => {
                info!(location = %record.location_ref, name = %record.display_name, "recording saved");
                Ok(())
            }
            Err(source) => {
                error!(location = %record.location_ref, error = %source, "recording not added to catalog");
                Err(RecorderError::Save { record, source })
            }
        }
    }

    /// Play a cataloged recording
    pub async fn play(&self, location: &LocationRef) -> Result<(), RecorderError> {
        if self.catalog.get(location).is_none() {
            return Err(CatalogError::NotFound(location.clone()).into());
        }
        if !self.catalog.assets().exists(location).await {
            return Err(CatalogError::AssetMissing(location.clone()).into());
        }
        Ok(self.session.play(location).await?)
    }

    pub async fn rename(&self, location: &LocationRef, name: &str) -> Result<(), RecorderError> {
        Ok(self.catalog.rename(location, name).await?)
    }

    pub async fn delete(&self, location: &LocationRef) -> Result<RecordingRecord, RecorderError> {
        Ok(self.catalog.delete(location).await?)
    }

    pub async fn share(
        &self,
        location: &LocationRef,
        destination: &Path,
    ) -> Result<PathBuf, RecorderError> {
        Ok(self.catalog.share(location, destination).await?)
    }
}
