//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kronikle - voice memos with a searchable local catalog
#[derive(Parser, Debug)]
#[command(name = "kronikle")]
#[command(version)]
#[command(about = "Record voice memos and keep them in a searchable local catalog")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory holding recordings and the catalog
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Diagnostic log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a new voice memo (p = pause, r = resume, s or Enter = stop)
    Record {
        /// Name for the recording; defaults to the time it is saved
        #[arg(short, long)]
        name: Option<String>,

        /// Stop automatically after this long (e.g. 90s, 10m, 1h)
        #[arg(short = 'm', long, value_name = "TIME")]
        max_duration: Option<String>,
    },
    /// List recordings, optionally filtered by name
    List {
        /// Case-insensitive text to look for in recording names
        #[arg(short, long, value_name = "QUERY")]
        search: Option<String>,
    },
    /// Rename a recording
    Rename {
        /// Recording location, as shown by `list`
        location: String,
        /// New display name
        name: String,
    },
    /// Delete a recording and its audio file
    Delete {
        /// Recording location, as shown by `list`
        location: String,
    },
    /// Play a recording
    Play {
        /// Recording location, as shown by `list`
        location: String,
    },
    /// Copy a recording's audio file into a directory
    Share {
        /// Recording location, as shown by `list`
        location: String,
        /// Directory to copy the file into
        dest: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &["data_dir", "max_duration", "log_level"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_defaults() {
        let cli = Cli::parse_from(["kronikle", "record"]);
        assert!(cli.data_dir.is_none());
        assert!(matches!(
            cli.command,
            Commands::Record {
                name: None,
                max_duration: None
            }
        ));
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from(["kronikle", "record", "-n", "Standup", "-m", "15m"]);
        match cli.command {
            Commands::Record { name, max_duration } => {
                assert_eq!(name.as_deref(), Some("Standup"));
                assert_eq!(max_duration.as_deref(), Some("15m"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn data_dir_is_global() {
        let cli = Cli::parse_from(["kronikle", "list", "--data-dir", "/tmp/k"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/k")));

        let cli = Cli::parse_from(["kronikle", "--data-dir", "/tmp/k", "list", "-s", "memo"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/k")));
        assert!(matches!(cli.command, Commands::List { search: Some(ref q) } if q == "memo"));
    }

    #[test]
    fn cli_parses_share() {
        let cli = Cli::parse_from(["kronikle", "share", "/rec/a.flac", "/tmp/out"]);
        match cli.command {
            Commands::Share { location, dest } => {
                assert_eq!(location, "/rec/a.flac");
                assert_eq!(dest, PathBuf::from("/tmp/out"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["kronikle", "config", "set", "max_duration", "5m"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "max_duration");
            assert_eq!(value, "5m");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["kronikle"]).is_err());
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("data_dir"));
        assert!(is_valid_config_key("log_level"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
