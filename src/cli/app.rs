//! Shared wiring for the CLI commands: config merging, logging, and
//! construction of the catalog and recorder over the data directory.

use std::env;
use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::ports::ConfigStore;
use crate::application::{RecorderUseCase, RecordingsCatalog, SessionController};
use crate::domain::config::{AppConfig, LogLevel};
use crate::infrastructure::{CpalCaptureDevice, FileKeyValueStore, FsAssetStore};

use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Overrides the data directory from the config file
pub const DATA_DIR_ENV: &str = "KRONIKLE_DATA_DIR";

/// Tracing filter directives, checked before `RUST_LOG`
pub const LOG_ENV: &str = "KRONIKLE_LOG";

pub type Catalog = RecordingsCatalog<FileKeyValueStore, FsAssetStore>;
pub type Recorder = RecorderUseCase<CpalCaptureDevice, FileKeyValueStore, FsAssetStore>;

/// Layout of the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    /// Finalized audio files
    pub recordings: PathBuf,
    /// Key-value store holding the catalog
    pub store: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            recordings: root.join("recordings"),
            store: root.join("store"),
            root,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.data_dir_or_default())
    }
}

/// Load and merge configuration: defaults < file < env < cli.
///
/// An unreadable config file is reported and otherwise ignored.
pub async fn load_merged_config<S: ConfigStore>(
    store: &S,
    cli_config: AppConfig,
    presenter: &Presenter,
) -> AppConfig {
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            presenter.warn(&format!("Ignoring config file: {}", e));
            AppConfig::empty()
        }
    };

    let env_config = AppConfig {
        data_dir: env::var(DATA_DIR_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

/// Install the stderr tracing subscriber.
///
/// `KRONIKLE_LOG` or `RUST_LOG` win over the configured level.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Catalog over the data directory, not yet loaded
pub fn open_catalog(paths: &DataPaths) -> Catalog {
    RecordingsCatalog::new(FileKeyValueStore::new(&paths.store), FsAssetStore::new())
}

/// Recorder over the default input device and the data directory
pub fn open_recorder(paths: &DataPaths) -> Recorder {
    RecorderUseCase::new(
        SessionController::new(CpalCaptureDevice::new(&paths.recordings)),
        open_catalog(paths),
    )
}

/// Load the catalog, reporting why it started empty if it did
pub async fn load_catalog(catalog: &Catalog, presenter: &Presenter) {
    if let Err(e) = catalog.load().await {
        presenter.warn(&e.to_string());
    }
}

/// Resolve a location argument the way `list` prints it
pub fn location_arg(raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_relative() && path.exists() {
        if let Ok(absolute) = std::fs::canonicalize(path) {
            return absolute.to_string_lossy().to_string();
        }
    }
    raw.to_string()
}
