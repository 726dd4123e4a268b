//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, and the command handlers.

pub mod app;
pub mod args;
pub mod catalog_cmd;
pub mod config_cmd;
pub mod presenter;
pub mod record_cmd;

pub use app::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction};
pub use presenter::Presenter;
