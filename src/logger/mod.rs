//! Structured logging for hostpulse
//!
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via `--debug-<module>` flags
//! - Dual output: colored console + daily log file
//!
//! ## Usage
//!
//! ```rust
//! use hostpulse::logger::{self, LogTag};
//!
//! logger::error(LogTag::Hub, "Failed to serialize envelope");
//! logger::warning(LogTag::Supervisor, "Channel not connected, dropping message");
//! logger::info(LogTag::Sampler, "Sampler started (interval=5000ms)");
//! logger::debug(LogTag::Hub, "broadcast delivered=3"); // Only with --debug-hub
//! logger::verbose(LogTag::Webserver, "client frame: {...}"); // Only with --verbose
//! ```
//!
//! Call `logger::init()` once at startup. Without it, logging still works
//! with default settings and console output only (tests rely on this).

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses command-line debug flags and opens the log file.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level, shown only with `--debug-<tag>`
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level, shown only with `--verbose` or `--verbose-<tag>`
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending log writes (call during shutdown)
pub fn flush() {
    file::flush_file_logging();
}
