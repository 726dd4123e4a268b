//! Persisted catalog schema
//!
//! Current layout (version 1):
//!
//! ```json
//! { "version": 1, "recordings": [ { "location_ref": "...", "display_name": "...", "created_at": "..." } ] }
//! ```
//!
//! Version 0 is the bare array `[{ "uri", "name", "date" }]` written by earlier
//! releases. It is upgraded on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{CatalogDecodeError, CatalogViolation};

use super::collection::Catalog;
use super::record::{LocationRef, RecordingRecord};

/// Schema version written by this build
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    version: u32,
    recordings: &'a [RecordingRecord],
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[allow(dead_code)]
    version: u32,
    recordings: Vec<RecordingRecord>,
}

#[derive(Deserialize)]
struct LegacyRecord {
    uri: String,
    name: String,
    date: DateTime<Utc>,
}

impl From<LegacyRecord> for RecordingRecord {
    fn from(legacy: LegacyRecord) -> Self {
        Self {
            location_ref: legacy_location(legacy.uri),
            display_name: legacy.name,
            created_at: legacy.date,
        }
    }
}

/// Earlier releases stored `file://` URIs; locations are plain paths now
fn legacy_location(uri: String) -> LocationRef {
    match uri.strip_prefix("file://") {
        Some(path) => LocationRef::new(
            urlencoding::decode(path)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| path.to_string()),
        ),
        None => LocationRef::new(uri),
    }
}

/// A catalog read back from storage, with the schema version it was stored in
#[derive(Debug, Clone)]
pub struct DecodedCatalog {
    pub catalog: Catalog,
    pub schema_version: u32,
}

impl DecodedCatalog {
    /// True when the stored copy predates the current schema
    pub fn needs_upgrade(&self) -> bool {
        self.schema_version < CATALOG_SCHEMA_VERSION
    }
}

impl Catalog {
    /// Serialize in the current schema
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&CatalogDocumentRef {
            version: CATALOG_SCHEMA_VERSION,
            recordings: self.records(),
        })
    }

    /// Parse a stored catalog. Every record field is mandatory; any gap makes
    /// the whole document malformed.
    pub fn decode(bytes: &[u8]) -> Result<DecodedCatalog, CatalogDecodeError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CatalogDecodeError::Malformed(e.to_string()))?;

        let (records, schema_version) = match value {
            Value::Array(_) => {
                let legacy: Vec<LegacyRecord> = serde_json::from_value(value)
                    .map_err(|e| CatalogDecodeError::Malformed(e.to_string()))?;
                (legacy.into_iter().map(RecordingRecord::from).collect(), 0)
            }
            Value::Object(_) => {
                let found = value
                    .get("version")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        CatalogDecodeError::Malformed("missing schema version".to_string())
                    })?;
                if found > u64::from(CATALOG_SCHEMA_VERSION) {
                    return Err(CatalogDecodeError::UnsupportedVersion {
                        found,
                        supported: CATALOG_SCHEMA_VERSION,
                    });
                }
                let document: CatalogDocument = serde_json::from_value(value)
                    .map_err(|e| CatalogDecodeError::Malformed(e.to_string()))?;
                (document.recordings, CATALOG_SCHEMA_VERSION)
            }
            other => {
                return Err(CatalogDecodeError::Malformed(format!(
                    "expected an object or array, found {}",
                    json_kind(&other)
                )))
            }
        };

        let catalog = Catalog::from_records(records).map_err(|violation| match violation {
            CatalogViolation::DuplicateAsset(location) | CatalogViolation::NotFound(location) => {
                CatalogDecodeError::DuplicateEntry(location)
            }
        })?;

        Ok(DecodedCatalog {
            catalog,
            schema_version,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
