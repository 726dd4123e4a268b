//! TOML settings file under the user's config directory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

const APP_DIR: &str = "kronikle";
const FILE_NAME: &str = "config.toml";

/// Settings at `$XDG_CONFIG_HOME/kronikle/config.toml`
#[derive(Debug, Clone)]
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        Self::at(base.join(APP_DIR).join(FILE_NAME))
    }

    /// Store backed by an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn decode(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn encode(config: &AppConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    fn write_error(path: &Path, e: std::io::Error) -> ConfigError {
        ConfigError::WriteError(format!("{}: {}", path.display(), e))
    }

    async fn ensure_parent(&self) -> Result<(), ConfigError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::write_error(parent, e)),
            _ => Ok(()),
        }
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AppConfig::empty()),
            Err(e) => {
                return Err(ConfigError::ReadError(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        debug!(path = %self.path.display(), "config loaded");
        Self::decode(&content)
    }

    /// Replace the file through a sibling temp file so readers never see
    /// a half-written config
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let body = Self::encode(config)?;
        self.ensure_parent().await?;

        let tmp = self.path.with_extension("toml.tmp");
        if let Err(e) = fs::write(&tmp, body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Self::write_error(&tmp, e));
        }
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Self::write_error(&self.path, e))?;

        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        let body = Self::encode(&AppConfig::defaults())?;
        self.ensure_parent().await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    ConfigError::AlreadyExists(self.path.to_string_lossy().to_string())
                }
                _ => Self::write_error(&self.path, e),
            })?;
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| Self::write_error(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| Self::write_error(&self.path, e))
    }
}
