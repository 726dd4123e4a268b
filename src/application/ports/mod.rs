//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod assets;
pub mod capture;
pub mod config;
pub mod storage;

// Re-export common types
pub use assets::{AssetError, AssetStore};
pub use capture::{CaptureDevice, CaptureHandle, DeviceError, Permission};
pub use config::ConfigStore;
pub use storage::{KeyValueStore, StorageError};
