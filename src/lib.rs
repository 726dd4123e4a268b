//! Kronikle - voice memo recorder with a searchable local catalog
//!
//! Records from the microphone with pause and resume, saves each recording
//! as a FLAC file, and keeps a catalog of named recordings that can be
//! searched, renamed, played, shared and deleted.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, catalog, config and errors
//! - **Application**: Session controller, catalog service, and port traits
//! - **Infrastructure**: Adapter implementations (cpal capture, file storage, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and output

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
