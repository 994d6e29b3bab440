/// Centralized argument handling for hostpulse
///
/// Arguments are stored once in a global vector so any module (logger,
/// config loader, entry point) can query flags without threading them
/// through every call.
use once_cell::sync::Lazy;
use std::env;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Vec<String>> = Lazy::new(|| env::args().collect());

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    CMD_ARGS.clone()
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value following a flag (`--config path`)
pub fn get_arg_value(flag: &str) -> Option<String> {
    value_after(&get_cmd_args(), flag)
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Top-level command selected by the first positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Sample host metrics and serve them over `/ws` (default)
    Serve,
    /// Connect to a server and print live snapshots
    Watch,
}

/// Resolve the command from the stored arguments
pub fn get_command() -> Result<Command, String> {
    command_from(&get_cmd_args())
}

fn command_from(args: &[String]) -> Result<Command, String> {
    // Skip the program name and any flag values so `--config serve.toml`
    // is not mistaken for a command.
    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "--url" {
            iter.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return match arg.as_str() {
            "serve" => Ok(Command::Serve),
            "watch" => Ok(Command::Watch),
            other => Err(format!("Unknown command '{}'. Use --help for usage.", other)),
        };
    }
    Ok(Command::Serve)
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Sampler debug mode
pub fn is_debug_sampler_enabled() -> bool {
    has_arg("--debug-sampler")
}

/// Hub debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Webserver debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Supervisor debug mode
pub fn is_debug_supervisor_enabled() -> bool {
    has_arg("--debug-supervisor")
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_sampler_enabled() {
        modes.push("sampler");
    }
    if is_debug_hub_enabled() {
        modes.push("hub");
    }
    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_supervisor_enabled() {
        modes.push("supervisor");
    }
    if patterns::is_verbose_mode() {
        modes.push("verbose");
    }

    modes
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available commands and flags
pub fn print_help() {
    println!("hostpulse - live host telemetry over WebSocket");
    println!();
    println!("USAGE:");
    println!("    hostpulse [serve|watch] [FLAGS]");
    println!();
    println!("COMMANDS:");
    println!("    serve                     Sample host metrics and broadcast on /ws (default)");
    println!("    watch                     Connect to a server and print live snapshots");
    println!();
    println!("FLAGS:");
    println!("    --config <path>           Configuration file (default: data/hostpulse.toml)");
    println!("    --url <ws-url>            Override the watch endpoint (watch only)");
    println!("    --help, -h                Show this help message");
    println!("    --quiet, -q               Only show warnings and errors");
    println!("    --verbose, -v             Show verbose output for every module");
    println!("    --no-log-file             Disable the daily log file");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-sampler           Sampler debug mode");
    println!("    --debug-hub               Hub debug mode");
    println!("    --debug-webserver         Webserver debug mode");
    println!("    --debug-supervisor        Supervisor debug mode");
    println!("    --debug-config            Configuration debug mode");
}

// =============================================================================
// COMMON ARGUMENT PATTERNS
// =============================================================================

pub mod patterns {
    use super::*;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    pub fn is_verbose_mode() -> bool {
        has_arg("--verbose") || has_arg("-v")
    }

    /// Configuration path override
    pub fn get_config_path() -> Option<String> {
        get_arg_value("--config")
    }

    /// Watch endpoint override
    pub fn get_url() -> Option<String> {
        get_arg_value("--url")
    }
}
