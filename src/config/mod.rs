/// Configuration system
///
/// - `macros`: `config_struct!` for struct + defaults in one declaration
/// - `schemas`: every configuration section
/// - `utils`: loading and thread-safe access
#[macro_use]
mod macros;
mod schemas;
mod utils;

pub use schemas::{Config, SamplerConfig, SupervisorConfig, WebserverConfig};
pub use utils::{get_config_clone, load_config_from_path, read_config_file, with_config};

use std::path::PathBuf;

/// Resolve the configuration path (`--config <path>` or the default location)
pub fn resolve_config_path() -> PathBuf {
    crate::arguments::patterns::get_config_path()
        .map(PathBuf::from)
        .unwrap_or_else(crate::paths::get_config_path)
}
