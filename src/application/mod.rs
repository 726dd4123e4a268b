//! Application layer - Use cases and port interfaces
//!
//! Contains the session controller, the catalog service, and the trait
//! definitions for the capture device and storage they drive.

pub mod catalog;
pub mod ports;
pub mod recorder;
pub mod session;

pub use catalog::{CatalogError, FilteredRecordings, RecordingsCatalog, CATALOG_KEY};
pub use recorder::{RecorderError, RecorderUseCase, SavedRecording, StartupReport};
pub use session::{
    FinishedCapture, PermissionStatus, SessionController, SessionError, SessionSnapshot,
};
