//! Catalog record value objects

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for names generated when the user gave none
pub const DEFAULT_NAME_PREFIX: &str = "Recording - ";

/// Opaque reference to a finalized audio asset.
/// Identity of a record within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationRef(String);

impl LocationRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LocationRef {
    fn from(location: String) -> Self {
        Self(location)
    }
}

impl From<&str> for LocationRef {
    fn from(location: &str) -> Self {
        Self(location.to_string())
    }
}

/// A saved recording as listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRecord {
    pub location_ref: LocationRef,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl RecordingRecord {
    /// Build a record at save time.
    ///
    /// Falls back to a timestamped label when `name` is missing or blank.
    pub fn new(location_ref: LocationRef, name: Option<String>, created_at: DateTime<Utc>) -> Self {
        let display_name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_display_name(created_at));

        Self {
            location_ref,
            display_name,
            created_at,
        }
    }

    /// Case-insensitive substring match on the display name.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        needle.is_empty() || self.display_name.to_lowercase().contains(needle)
    }
}

/// "Recording - <local timestamp>"
pub fn default_display_name(created_at: DateTime<Utc>) -> String {
    format!(
        "{}{}",
        DEFAULT_NAME_PREFIX,
        created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )
}
