//! Recordings catalog domain module

mod collection;
mod document;
mod record;

pub use collection::{Catalog, Filter};
pub use document::{DecodedCatalog, CATALOG_SCHEMA_VERSION};
pub use record::{default_display_name, LocationRef, RecordingRecord, DEFAULT_NAME_PREFIX};
