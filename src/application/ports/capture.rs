//! Audio capture device port

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::LocationRef;

/// Capture device errors
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("No audio input device available")]
    NoDevice,

    #[error("Capture channel is already in use")]
    ChannelBusy,

    #[error("Capture handle {0} is not the active capture")]
    InvalidHandle(u64),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Failed to finalize recording: {0}")]
    FinalizeFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// Microphone permission as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Token for the one capture the device is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle(u64);

impl CaptureHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// Port for the audio capture hardware.
///
/// The device owns a single capture channel. `stop_and_finalize` always
/// releases it, whether or not an asset could be produced.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Ask for microphone access
    async fn request_permission(&self) -> Result<Permission, DeviceError>;

    /// Acquire the capture channel and begin capturing
    async fn start(&self) -> Result<CaptureHandle, DeviceError>;

    /// Suspend capturing; the channel stays acquired
    async fn pause(&self, handle: CaptureHandle) -> Result<(), DeviceError>;

    /// Continue a suspended capture
    async fn resume(&self, handle: CaptureHandle) -> Result<(), DeviceError>;

    /// Release the channel and write the captured audio out as an asset
    async fn stop_and_finalize(&self, handle: CaptureHandle) -> Result<LocationRef, DeviceError>;

    /// Play a finalized asset to completion
    async fn play(&self, location: &LocationRef) -> Result<(), DeviceError>;
}

#[async_trait]
impl<T: CaptureDevice + ?Sized> CaptureDevice for Arc<T> {
    async fn request_permission(&self) -> Result<Permission, DeviceError> {
        self.as_ref().request_permission().await
    }

    async fn start(&self) -> Result<CaptureHandle, DeviceError> {
        self.as_ref().start().await
    }

    async fn pause(&self, handle: CaptureHandle) -> Result<(), DeviceError> {
        self.as_ref().pause(handle).await
    }

    async fn resume(&self, handle: CaptureHandle) -> Result<(), DeviceError> {
        self.as_ref().resume(handle).await
    }

    async fn stop_and_finalize(&self, handle: CaptureHandle) -> Result<LocationRef, DeviceError> {
        self.as_ref().stop_and_finalize(handle).await
    }

    async fn play(&self, location: &LocationRef) -> Result<(), DeviceError> {
        self.as_ref().play(location).await
    }
}
