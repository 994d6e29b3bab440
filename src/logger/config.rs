/// Logger configuration derived from command-line flags
///
/// Flags understood:
/// - `--debug-<tag>`: enable DEBUG output for one tag
/// - `--verbose`: enable VERBOSE output for every tag
/// - `--verbose-<tag>`: enable VERBOSE output for one tag
/// - `--quiet`: only errors and warnings
/// - `--no-log-file`: console only
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::get_cmd_args;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level that passes the threshold check
    pub min_level: LogLevel,
    /// Tags with debug output enabled
    pub debug_tags: HashSet<String>,
    /// Tags with verbose output enabled
    pub verbose_tags: HashSet<String>,
    /// Mirror log lines to the daily file
    pub file_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            // Debug is the threshold so per-tag debug flags can pass; untagged
            // debug lines are still filtered by `is_debug_enabled_for_tag`.
            min_level: LogLevel::Debug,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            file_enabled: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    match LOGGER_CONFIG.read() {
        Ok(cfg) => cfg.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    match LOGGER_CONFIG.write() {
        Ok(mut cfg) => *cfg = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Build the logger configuration from the global argument vector
pub fn init_from_args() {
    set_logger_config(config_from_args(&get_cmd_args()));
}

pub(super) fn config_from_args(args: &[String]) -> LoggerConfig {
    let mut config = LoggerConfig::default();

    for arg in args {
        if arg == "--verbose" || arg == "-v" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" || arg == "-q" {
            config.min_level = LogLevel::Warning;
        } else if arg == "--no-log-file" {
            config.file_enabled = false;
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_lowercase());
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_lowercase());
        }
    }

    config
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.min_level == LogLevel::Verbose || config.debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .verbose_tags
        .contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flags_are_collected_per_tag() {
        let cfg = config_from_args(&args(&["hostpulse", "--debug-hub", "--debug-Supervisor"]));
        assert!(cfg.debug_tags.contains("hub"));
        assert!(cfg.debug_tags.contains("supervisor"));
        assert!(!cfg.debug_tags.contains("sampler"));
        assert_eq!(cfg.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_and_verbose_flags() {
        assert_eq!(
            config_from_args(&args(&["--quiet"])).min_level,
            LogLevel::Warning
        );
        assert_eq!(
            config_from_args(&args(&["--verbose"])).min_level,
            LogLevel::Verbose
        );
        assert!(!config_from_args(&args(&["--no-log-file"])).file_enabled);
    }
}
