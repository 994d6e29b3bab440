//! Centralized path resolution for hostpulse
//!
//! Both the server and the watcher resolve their files through this module so
//! that logs and configuration land in the same place on every platform:
//! - **macOS**: `~/Library/Application Support/hostpulse/`
//! - **Windows**: `%LOCALAPPDATA%\hostpulse\`
//! - **Linux**: `$XDG_DATA_HOME/hostpulse/` (fallback `~/.local/share/hostpulse/`)
//!
//! ```text
//! hostpulse/
//! ├── data/
//! │   └── hostpulse.toml
//! └── logs/
//!     └── hostpulse_YYYY-MM-DD.log
//! ```

use once_cell::sync::Lazy;
use std::path::PathBuf;

const APP_DIR: &str = "hostpulse";

/// Environment override for the base directory (useful for containers and tests)
pub const BASE_DIR_ENV: &str = "HOSTPULSE_HOME";

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

fn resolve_base_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os(BASE_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

/// Returns the base directory for all hostpulse files
pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the data directory path (configuration lives here)
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Returns the logs directory path
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// Returns the default configuration file path
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("hostpulse.toml")
}

/// Create every directory hostpulse writes to
///
/// Must run before `logger::init()` since the file sink opens its log file
/// inside the logs directory.
pub fn ensure_all_directories() -> Result<(), String> {
    let dirs_to_create = [("data", get_data_directory()), ("logs", get_logs_directory())];

    for (name, dir) in dirs_to_create {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    dir.display(),
                    e
                )
            })?;
        }
    }

    Ok(())
}
