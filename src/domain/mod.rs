//! Domain layer - Core business logic
//!
//! Contains the recording session state machine, the recordings catalog,
//! value objects and domain errors.
//! This layer has no dependencies on external systems.

pub mod catalog;
pub mod config;
pub mod error;
pub mod recording;
pub mod session;

// Re-export common types
pub use catalog::{Catalog, LocationRef, RecordingRecord};
pub use config::AppConfig;
pub use error::*;
pub use recording::Duration;
pub use session::{RecordingSession, SessionState, Transition};
