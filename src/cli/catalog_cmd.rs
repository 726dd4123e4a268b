//! Catalog command handlers: list, rename, delete, share and play

use std::path::Path;

use crate::application::ports::{AssetStore, CaptureDevice, KeyValueStore};
use crate::application::{CatalogError, RecorderError, RecorderUseCase, RecordingsCatalog};
use crate::domain::catalog::LocationRef;

use super::presenter::Presenter;

pub async fn handle_list<S: KeyValueStore, A: AssetStore>(
    catalog: &RecordingsCatalog<S, A>,
    search: Option<&str>,
    presenter: &Presenter,
) -> Result<(), CatalogError> {
    let results = catalog.filter(search.unwrap_or(""));

    let mut shown = 0;
    for record in &results {
        presenter.record(record);
        shown += 1;
    }

    if shown == 0 {
        match search {
            Some(query) => presenter.info(&format!("No recordings match \"{}\"", query)),
            None => presenter.info("No recordings yet"),
        }
    }
    Ok(())
}

pub async fn handle_rename<S: KeyValueStore, A: AssetStore>(
    catalog: &RecordingsCatalog<S, A>,
    location: &str,
    name: &str,
    presenter: &Presenter,
) -> Result<(), CatalogError> {
    catalog.rename(&LocationRef::from(location), name).await?;
    presenter.success(&format!("Renamed to \"{}\"", name));
    Ok(())
}

pub async fn handle_delete<S: KeyValueStore, A: AssetStore>(
    catalog: &RecordingsCatalog<S, A>,
    location: &str,
    presenter: &Presenter,
) -> Result<(), CatalogError> {
    let removed = catalog.delete(&LocationRef::from(location)).await?;
    presenter.success(&format!("Deleted \"{}\"", removed.display_name));
    Ok(())
}

/// Copy the asset out and print where it landed
pub async fn handle_share<S: KeyValueStore, A: AssetStore>(
    catalog: &RecordingsCatalog<S, A>,
    location: &str,
    dest: &Path,
    presenter: &Presenter,
) -> Result<(), CatalogError> {
    let shared = catalog.share(&LocationRef::from(location), dest).await?;
    presenter.output(&shared.to_string_lossy());
    Ok(())
}

pub async fn handle_play<D: CaptureDevice, S: KeyValueStore, A: AssetStore>(
    recorder: &RecorderUseCase<D, S, A>,
    location: &str,
    presenter: &mut Presenter,
) -> Result<(), RecorderError> {
    let location = LocationRef::from(location);
    let name = recorder
        .catalog()
        .get(&location)
        .map(|record| record.display_name)
        .unwrap_or_else(|| location.to_string());

    presenter.start_spinner(&format!("Playing \"{}\"", name));
    match recorder.play(&location).await {
        Ok(()) => {
            presenter.spinner_success("Done");
            Ok(())
        }
        Err(e) => {
            presenter.spinner_fail("Playback stopped");
            Err(e)
        }
    }
}
