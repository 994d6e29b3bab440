/// Configuration utilities - loading and access helpers
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::RwLock;

use super::schemas::Config;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Read and validate a configuration file without touching the global
///
/// A missing file yields the defaults.
pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        Config::default()
    };

    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Load configuration from a file path and initialize the global CONFIG
pub fn load_config_from_path(path: &Path) -> Result<(), ConfigError> {
    let config = read_config_file(path)?;

    logger::debug(
        LogTag::Config,
        &format!("Loaded configuration from {}: {:?}", path.display(), config),
    );

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when the global has not been loaded, so library
/// users and tests never panic on access.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => match lock.read() {
            Ok(config) => f(&config),
            Err(poisoned) => f(&poisoned.into_inner()),
        },
        None => f(&Config::default()),
    }
}

/// Get a clone of the entire configuration (for use across await points)
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}
