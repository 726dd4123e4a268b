//! Domain error types

use thiserror::Error;

use crate::domain::catalog::LocationRef;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>h, <number>m, <number>s or a combination (e.g., 30s, 5m, 1h30m)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// A catalog mutation that would break the catalog's invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogViolation {
    #[error("A recording for {0} is already in the catalog")]
    DuplicateAsset(LocationRef),

    #[error("No recording for {0} in the catalog")]
    NotFound(LocationRef),
}

/// Error when a persisted catalog cannot be read back
#[derive(Debug, Clone, Error)]
pub enum CatalogDecodeError {
    #[error("malformed catalog document: {0}")]
    Malformed(String),

    #[error("catalog schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("catalog lists {0} more than once")]
    DuplicateEntry(LocationRef),
}
