//! User settings port

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Where user settings (data directory, duration limit, log level) live
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the settings file. A missing file yields an all-`None` config.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write a settings file holding the defaults; errors if one is already there
    async fn init(&self) -> Result<(), ConfigError>;
}
