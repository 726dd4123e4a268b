//! Interactive record command
//!
//! Reads one-letter commands from stdin while a session runs and stops the
//! session on `s`, an empty line, end of input, Ctrl+C, or the duration limit.

use std::future::Future;
use std::io::BufRead;
use std::time::Duration as StdDuration;

use tokio::sync::mpsc;
use tokio::time::interval;

use crate::application::ports::{AssetStore, CaptureDevice, KeyValueStore};
use crate::application::{
    CatalogError, PermissionStatus, RecorderError, RecorderUseCase, SavedRecording, SessionError,
};
use crate::domain::recording::Duration;

use super::presenter::Presenter;

/// How often the elapsed time on screen is refreshed
const REFRESH_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// A line typed while recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Stop,
    Unknown(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" => Self::Pause,
            "r" | "resume" => Self::Resume,
            "" | "s" | "stop" => Self::Stop,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Why the session loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    EndOfInput,
    Interrupted,
    LimitReached,
}

/// Forward stdin lines from a detached thread so a pending read never
/// holds up shutdown
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Record one memo and add it to the catalog
pub async fn handle_record<D, S, A>(
    recorder: &RecorderUseCase<D, S, A>,
    name: Option<String>,
    limit: Duration,
    input: mpsc::UnboundedReceiver<String>,
    shutdown: impl Future<Output = ()>,
    presenter: &mut Presenter,
) -> Result<(), RecorderError>
where
    D: CaptureDevice,
    S: KeyValueStore,
    A: AssetStore,
{
    let report = recorder.initialize().await;
    match report.catalog {
        Ok(_) => {}
        Err(e @ CatalogError::CorruptCatalog(_)) => presenter.warn(&e.to_string()),
        // Nothing recorded now could be added to the list
        Err(e) => return Err(e.into()),
    }
    if report.permission != PermissionStatus::Granted {
        return Err(SessionError::PermissionDenied.into());
    }

    recorder.start(name).await?;
    presenter.start_spinner(&Presenter::format_session(recorder.snapshot(), limit));
    presenter.info("p = pause, r = resume, s or Enter = stop");

    let reason = run_session(recorder, limit, input, shutdown, presenter).await;
    if reason == StopReason::LimitReached {
        presenter.info(&format!("Reached the {} limit", limit));
    }

    finish(recorder, presenter).await
}

async fn run_session<D, S, A>(
    recorder: &RecorderUseCase<D, S, A>,
    limit: Duration,
    mut input: mpsc::UnboundedReceiver<String>,
    shutdown: impl Future<Output = ()>,
    presenter: &Presenter,
) -> StopReason
where
    D: CaptureDevice,
    S: KeyValueStore,
    A: AssetStore,
{
    tokio::pin!(shutdown);
    let mut refresh = interval(REFRESH_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut shutdown => return StopReason::Interrupted,
            line = input.recv() => {
                let Some(line) = line else {
                    return StopReason::EndOfInput;
                };
                match SessionCommand::parse(&line) {
                    SessionCommand::Stop => return StopReason::Requested,
                    SessionCommand::Pause => {
                        if let Err(e) = recorder.pause().await {
                            presenter.warn(&e.to_string());
                        }
                    }
                    SessionCommand::Resume => {
                        if let Err(e) = recorder.resume().await {
                            presenter.warn(&e.to_string());
                        }
                    }
                    SessionCommand::Unknown(other) => {
                        presenter.warn(&format!("Unknown command \"{}\"", other));
                    }
                }
                presenter.update_session(recorder.snapshot(), limit);
            }
            _ = refresh.tick() => {
                let snapshot = recorder.snapshot();
                presenter.update_session(snapshot, limit);
                if snapshot.elapsed_seconds >= limit.as_secs() {
                    return StopReason::LimitReached;
                }
            }
        }
    }
}

/// Stop and save, retrying the catalog write once if it fails
async fn finish<D, S, A>(
    recorder: &RecorderUseCase<D, S, A>,
    presenter: &mut Presenter,
) -> Result<(), RecorderError>
where
    D: CaptureDevice,
    S: KeyValueStore,
    A: AssetStore,
{
    let saved = match recorder.stop_and_save().await {
        Ok(saved) => saved,
        Err(RecorderError::Save { record, source }) => {
            presenter.warn(&format!("{}; retrying", source));
            if let Err(e) = recorder.save(record.clone()).await {
                presenter.spinner_fail("Recording not added to the list");
                presenter.info(&format!("Audio kept at {}", record.location_ref));
                return Err(e);
            }
            SavedRecording {
                record,
                elapsed_seconds: recorder.snapshot().elapsed_seconds,
            }
        }
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            return Err(e);
        }
    };

    presenter.spinner_success(&format!(
        "Saved \"{}\" ({})",
        saved.record.display_name,
        Duration::from_secs(saved.elapsed_seconds).as_clock()
    ));
    presenter.output(saved.record.location_ref.as_str());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AssetError, CaptureHandle, DeviceError, Permission, StorageError,
    };
    use crate::application::{RecordingsCatalog, SessionController};
    use crate::domain::catalog::LocationRef;
    use crate::domain::session::SessionState;
    use crate::infrastructure::MemoryKeyValueStore;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct FakeDevice;

    #[async_trait]
    impl CaptureDevice for FakeDevice {
        async fn request_permission(&self) -> Result<Permission, DeviceError> {
            Ok(Permission::Granted)
        }

        async fn start(&self) -> Result<CaptureHandle, DeviceError> {
            Ok(CaptureHandle::new(7))
        }

        async fn pause(&self, _handle: CaptureHandle) -> Result<(), DeviceError> {
            Ok(())
        }

        async fn resume(&self, _handle: CaptureHandle) -> Result<(), DeviceError> {
            Ok(())
        }

        async fn stop_and_finalize(
            &self,
            _handle: CaptureHandle,
        ) -> Result<LocationRef, DeviceError> {
            Ok(LocationRef::from("memo-7.flac"))
        }

        async fn play(&self, _location: &LocationRef) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    struct NoAssets;

    #[async_trait]
    impl AssetStore for NoAssets {
        async fn exists(&self, _location: &LocationRef) -> bool {
            true
        }

        async fn remove(&self, _location: &LocationRef) -> Result<(), AssetError> {
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

    struct UnreadableStore;

    #[async_trait]
    impl KeyValueStore for UnreadableStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("mount lost".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
            panic!("catalog must not be written");
        }
    }

    fn recorder() -> RecorderUseCase<FakeDevice, MemoryKeyValueStore, NoAssets> {
        RecorderUseCase::new(
            SessionController::new(FakeDevice),
            RecordingsCatalog::new(MemoryKeyValueStore::new(), NoAssets),
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!(SessionCommand::parse("p"), SessionCommand::Pause);
        assert_eq!(SessionCommand::parse(" R \n"), SessionCommand::Resume);
        assert_eq!(SessionCommand::parse(""), SessionCommand::Stop);
        assert_eq!(SessionCommand::parse("stop"), SessionCommand::Stop);
        assert_eq!(
            SessionCommand::parse("x"),
            SessionCommand::Unknown("x".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_limit_and_saves() {
        let recorder = recorder();
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut presenter = Presenter::new();

        handle_record(
            &recorder,
            Some("Limited".to_string()),
            Duration::from_secs(3),
            rx,
            std::future::pending(),
            &mut presenter,
        )
        .await
        .unwrap();

        let saved = recorder.catalog().filter("limited").to_vec();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].location_ref.as_str(), "memo-7.flac");
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_input_stops_recording() {
        let recorder = recorder();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(tx);
        let mut presenter = Presenter::new();

        handle_record(
            &recorder,
            None,
            Duration::from_secs(60),
            rx,
            std::future::pending(),
            &mut presenter,
        )
        .await
        .unwrap();

        assert_eq!(recorder.catalog().len(), 1);
        assert_eq!(recorder.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn unreadable_catalog_blocks_recording() {
        let recorder = RecorderUseCase::new(
            SessionController::new(FakeDevice),
            RecordingsCatalog::new(UnreadableStore, NoAssets),
        );
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut presenter = Presenter::new();

        let result = handle_record(
            &recorder,
            None,
            Duration::from_secs(60),
            rx,
            std::future::pending(),
            &mut presenter,
        )
        .await;

        assert!(matches!(
            result,
            Err(RecorderError::Catalog(CatalogError::StorageUnavailable(_)))
        ));
        assert_eq!(recorder.snapshot().state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_still_saves() {
        let recorder = recorder();
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut presenter = Presenter::new();

        handle_record(
            &recorder,
            None,
            Duration::from_secs(60),
            rx,
            tokio::time::sleep(StdDuration::from_secs(2)),
            &mut presenter,
        )
        .await
        .unwrap();

        assert_eq!(recorder.catalog().len(), 1);
    }
}
