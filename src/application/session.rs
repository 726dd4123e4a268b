//! Recording session controller
//!
//! Wraps the capture device with the session state machine. The controller
//! owns the only [`RecordingSession`], guards every transition with a busy
//! flag, and runs the per-second ticker that accrues elapsed time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, warn};

use crate::domain::catalog::LocationRef;
use crate::domain::session::{InvalidStateTransition, RecordingSession, SessionState, Transition};

use super::ports::{CaptureDevice, CaptureHandle, DeviceError, Permission};

/// How often elapsed time accrues while recording
pub const TICK_PERIOD: StdDuration = StdDuration::from_secs(1);

/// Errors from session transitions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Another session operation is still in progress")]
    Busy,

    #[error("A recording is already in progress")]
    AlreadyActive,

    #[error("No recording in progress")]
    NotActive,

    #[error("Capture device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Recording could not be saved: {0}")]
    Finalize(String),
}

/// Permission as known to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// Not asked yet
    #[default]
    Pending,
    Granted,
    Denied,
}

/// Point-in-time view of the session for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub elapsed_seconds: u64,
}

/// A stopped session whose audio was finalized into an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedCapture {
    pub location_ref: LocationRef,
    pub pending_name: Option<String>,
    pub elapsed_seconds: u64,
}

/// Clears the busy flag when a transition completes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Session controller over a capture device
pub struct SessionController<D: CaptureDevice> {
    device: D,
    session: Arc<Mutex<RecordingSession>>,
    handle: Mutex<Option<CaptureHandle>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    permission: Mutex<PermissionStatus>,
    busy: AtomicBool,
    tick_period: StdDuration,
}

impl<D: CaptureDevice> SessionController<D> {
    /// Create an idle controller with permission still pending
    pub fn new(device: D) -> Self {
        Self {
            device,
            session: Arc::new(Mutex::new(RecordingSession::new())),
            handle: Mutex::new(None),
            ticker: Mutex::new(None),
            permission: Mutex::new(PermissionStatus::Pending),
            busy: AtomicBool::new(false),
            tick_period: TICK_PERIOD,
        }
    }

    /// Override the tick period
    pub fn with_tick_period(mut self, period: StdDuration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.session().elapsed_seconds()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            state: session.state(),
            elapsed_seconds: session.elapsed_seconds(),
        }
    }

    pub fn permission(&self) -> PermissionStatus {
        *lock(&self.permission)
    }

    /// True while a transition is awaiting the device
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Query the device for microphone permission and remember the answer
    pub async fn request_permission(&self) -> Result<PermissionStatus, SessionError> {
        let status = match self.device.request_permission().await? {
            Permission::Granted => PermissionStatus::Granted,
            Permission::Denied => PermissionStatus::Denied,
        };
        *lock(&self.permission) = status;
        debug!(?status, "microphone permission resolved");
        Ok(status)
    }

    /// IDLE -> RECORDING.
    ///
    /// `label` becomes the recording's name when it is saved.
    pub async fn start(&self, label: Option<String>) -> Result<(), SessionError> {
        let _busy = self.begin().ok_or(SessionError::Busy)?;

        if self.permission() != PermissionStatus::Granted {
            return Err(SessionError::PermissionDenied);
        }
        if self.session().is_active() {
            return Err(SessionError::AlreadyActive);
        }

        let handle = self.device.start().await.map_err(|e| {
            error!(error = %e, "capture device refused to start");
            SessionError::Device(e)
        })?;

        let started = self.session().start(label);
        if let Err(e) = started {
            // Release the channel just acquired
            if let Err(release) = self.device.stop_and_finalize(handle).await {
                warn!(error = %release, "could not release capture channel");
            }
            return Err(transition_error(e));
        }
        *lock(&self.handle) = Some(handle);
        self.spawn_ticker();

        debug!(handle = handle.id(), "recording started");
        Ok(())
    }

    /// RECORDING -> PAUSED. Ignored in any other state or while busy.
    ///
    /// The elapsed counter freezes before the device is asked to pause.
    pub async fn pause(&self) -> Result<Transition, SessionError> {
        let Some(_busy) = self.begin() else {
            return Ok(Transition::Ignored);
        };

        if self.session().pause() == Transition::Ignored {
            return Ok(Transition::Ignored);
        }
        self.stop_ticker();

        let handle = *lock(&self.handle);
        let Some(handle) = handle else {
            return Ok(Transition::Applied);
        };
        if let Err(e) = self.device.pause(handle).await {
            warn!(error = %e, "device failed to pause, still recording");
            self.session().resume();
            self.spawn_ticker();
            return Err(e.into());
        }

        debug!(elapsed = self.elapsed_seconds(), "recording paused");
        Ok(Transition::Applied)
    }

    /// PAUSED -> RECORDING. Ignored in any other state or while busy.
    pub async fn resume(&self) -> Result<Transition, SessionError> {
        let Some(_busy) = self.begin() else {
            return Ok(Transition::Ignored);
        };

        if !self.session().is_paused() {
            return Ok(Transition::Ignored);
        }
        let handle = *lock(&self.handle);
        if let Some(handle) = handle {
            self.device.resume(handle).await?;
        }

        self.session().resume();
        self.spawn_ticker();

        debug!(elapsed = self.elapsed_seconds(), "recording resumed");
        Ok(Transition::Applied)
    }

    /// RECORDING | PAUSED -> IDLE, finalizing the capture into an asset.
    ///
    /// The session is idle and the channel released even when finalizing
    /// fails; the captured audio is then discarded.
    pub async fn stop(&self) -> Result<FinishedCapture, SessionError> {
        let _busy = self.begin().ok_or(SessionError::Busy)?;

        let stopped = self.session().stop().map_err(transition_error)?;
        self.stop_ticker();

        let handle = lock(&self.handle)
            .take()
            .ok_or_else(|| SessionError::Finalize("no active capture handle".to_string()))?;

        match self.device.stop_and_finalize(handle).await {
            Ok(location_ref) => {
                debug!(
                    location = %location_ref,
                    elapsed = stopped.elapsed_seconds,
                    "recording finalized"
                );
                Ok(FinishedCapture {
                    location_ref,
                    pending_name: stopped.pending_name,
                    elapsed_seconds: stopped.elapsed_seconds,
                })
            }
            Err(e) => {
                warn!(error = %e, "finalize failed, captured audio discarded");
                Err(SessionError::Finalize(e.to_string()))
            }
        }
    }

    /// Play a finalized asset through the device
    pub async fn play(&self, location: &LocationRef) -> Result<(), SessionError> {
        self.device.play(location).await?;
        Ok(())
    }

    fn session(&self) -> MutexGuard<'_, RecordingSession> {
        lock(&self.session)
    }

    fn begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    fn spawn_ticker(&self) {
        let session = Arc::clone(&self.session);
        let period = self.tick_period;
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                lock(&session).tick();
            }
        });
        if let Some(previous) = lock(&self.ticker).replace(task) {
            previous.abort();
        }
    }

    fn stop_ticker(&self) {
        if let Some(task) = lock(&self.ticker).take() {
            task.abort();
        }
    }
}

impl<D: CaptureDevice> Drop for SessionController<D> {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn transition_error(e: InvalidStateTransition) -> SessionError {
    match e.current_state {
        SessionState::Idle => SessionError::NotActive,
        SessionState::Recording | SessionState::Paused => SessionError::AlreadyActive,
    }
}
