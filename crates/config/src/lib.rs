use std::path::{Path, PathBuf};

use thiserror::Error;
use utils_core::assets::config_path;

mod schema;

pub use schema::{Config, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOKEN_TTL_DAYS};

pub const CONFIG_PATH_ENV: &str = "TASKBOARD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub fn load_config_from_file(config_path: &Path) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!(
                    path = %config_path.display(),
                    "No config file found, using defaults"
                );
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Defaults, then the JSON file, then environment overrides.
pub fn load() -> Result<Config, ConfigError> {
    let path = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => config_path()?,
    };
    load_config_from_file(&path).with_env_overrides(|key| std::env::var(key).ok())
}
