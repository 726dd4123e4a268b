//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces:
//! cpal capture, FLAC files on disk, a file-backed key-value store,
//! and the XDG config file.

pub mod assets;
pub mod capture;
pub mod config;
pub mod storage;

pub use assets::FsAssetStore;
pub use capture::CpalCaptureDevice;
pub use config::XdgConfigStore;
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};
