//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, LogLevel};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let value = normalize_value(key, value)?;

    let mut config = store.load().await?;
    *field_mut(&mut config, key) = Some(value.clone());

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    let value = field_mut(&mut config, key).take();
    presenter.output(value.as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let mut config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = field_mut(&mut config, key).take();
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

/// Slot in the config for a validated key
fn field_mut<'a>(config: &'a mut AppConfig, key: &str) -> &'a mut Option<String> {
    match key {
        "data_dir" => &mut config.data_dir,
        "max_duration" => &mut config.max_duration,
        _ => &mut config.log_level,
    }
}

/// Validate a value and return the form that gets stored
fn normalize_value(key: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "max_duration" => value
            .parse::<Duration>()
            .map(|d| d.to_string())
            .map_err(|e| invalid(e.to_string())),
        "log_level" => value.parse::<LogLevel>().map(|level| level.to_string()),
        "data_dir" => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(invalid("Path must not be empty".to_string()))
            } else {
                Ok(trimmed.to_string())
            }
        }
        _ => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryConfigStore {
        config: Mutex<AppConfig>,
    }

    #[async_trait]
    impl ConfigStore for MemoryConfigStore {
        async fn load(&self) -> Result<AppConfig, ConfigError> {
            Ok(self.config.lock().unwrap().clone())
        }

        async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
            *self.config.lock().unwrap() = config.clone();
            Ok(())
        }

        fn path(&self) -> PathBuf {
            PathBuf::from("/tmp/kronikle/config.toml")
        }

        fn exists(&self) -> bool {
            true
        }

        async fn init(&self) -> Result<(), ConfigError> {
            self.save(&AppConfig::defaults()).await
        }
    }

    #[test]
    fn normalizes_durations() {
        assert_eq!(normalize_value("max_duration", "90m").unwrap(), "1h30m");
        assert!(normalize_value("max_duration", "soon").is_err());
    }

    #[test]
    fn normalizes_log_levels() {
        assert_eq!(normalize_value("log_level", "DEBUG").unwrap(), "debug");
        assert!(normalize_value("log_level", "chatty").is_err());
    }

    #[test]
    fn rejects_blank_data_dir() {
        assert!(normalize_value("data_dir", "  ").is_err());
        assert_eq!(normalize_value("data_dir", " /srv/k ").unwrap(), "/srv/k");
    }

    #[tokio::test]
    async fn set_persists_normalized_value() {
        let store = MemoryConfigStore::default();
        let presenter = Presenter::new();

        handle_set(&store, &presenter, "max_duration", "120s")
            .await
            .unwrap();
        assert_eq!(
            store.load().await.unwrap().max_duration,
            Some("2m".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let store = MemoryConfigStore::default();
        let presenter = Presenter::new();

        assert!(matches!(
            handle_set(&store, &presenter, "api_key", "x").await,
            Err(ConfigError::ValidationError { .. })
        ));
        assert!(handle_get(&store, &presenter, "nope").await.is_err());
    }
}
