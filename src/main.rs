use hostpulse::{
    arguments::{get_command, get_enabled_debug_modes, patterns, print_help},
    logger::{self, LogTag},
};

/// Main entry point for hostpulse
///
/// - `serve` (default): sample host metrics and broadcast them on `/ws`
/// - `watch`: connect to a server and print live snapshots
#[tokio::main]
async fn main() {
    // Directories must exist before the logger opens its file
    if let Err(e) = hostpulse::paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    let command = match get_command() {
        Ok(command) => command,
        Err(e) => {
            logger::error(LogTag::System, &e);
            std::process::exit(2);
        }
    };

    logger::info(
        LogTag::System,
        &format!("hostpulse {} starting ({:?})", env!("CARGO_PKG_VERSION"), command),
    );

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes enabled: {}", debug_modes.join(", ")),
        );
    }

    match hostpulse::run::run(command).await {
        Ok(()) => {
            logger::info(LogTag::System, "hostpulse stopped");
            logger::flush();
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            logger::flush();
            std::process::exit(1);
        }
    }
}
