/// Command runners for the `hostpulse` binary
///
/// `serve`: sampler + webserver until a shutdown signal.
/// `watch`: supervisor against a push endpoint, printing every new
/// snapshot and liveness change until a shutdown signal.
use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::{
    arguments::{patterns, Command},
    config::{self, Config},
    logger::{self, LogTag},
    metrics::{MetricsSnapshot, SystemSnapshotSource},
    sampler::Sampler,
    supervisor::{ConnectionState, Supervisor},
    webserver::{self, ws::WsHub},
};

/// Grace period for background tasks after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Load configuration and run the selected command
pub async fn run(command: Command) -> Result<()> {
    let config_path = config::resolve_config_path();
    config::load_config_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let cfg = config::get_config_clone();
    match command {
        Command::Serve => run_serve(cfg).await,
        Command::Watch => run_watch(cfg).await,
    }
}

// =============================================================================
// SERVE
// =============================================================================

async fn run_serve(cfg: Config) -> Result<()> {
    let hub = WsHub::new(cfg.webserver.subscriber_buffer);

    let source = Arc::new(SystemSnapshotSource::new(cfg.sampler.include_disks));
    let sampler = Sampler::from_config(&cfg.sampler, source, Arc::clone(&hub));
    let sampler_shutdown = Arc::new(Notify::new());
    let sampler_task = tokio::spawn(sampler.run(Arc::clone(&sampler_shutdown)));

    let mut server_task = tokio::spawn(webserver::start_server(cfg.webserver.clone(), Arc::clone(&hub)));

    tokio::select! {
        result = &mut server_task => {
            // only reached when the server could not start or crashed
            sampler_shutdown.notify_one();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow!(e)).context("Webserver failed"),
                Err(e) => Err(anyhow!("Webserver task panicked: {}", e)),
            };
        }
        signal = wait_for_shutdown_signal() => signal.map_err(|e| anyhow!(e))?,
    }

    logger::info(LogTag::System, "Initiating graceful shutdown...");
    sampler_shutdown.notify_one();
    webserver::shutdown();

    if timeout(SHUTDOWN_GRACE, sampler_task).await.is_err() {
        logger::warning(LogTag::System, "Sampler did not stop in time");
    }
    match timeout(SHUTDOWN_GRACE, server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => logger::error(LogTag::Webserver, &format!("Webserver error during shutdown: {}", e)),
        Ok(Err(e)) => logger::error(LogTag::Webserver, &format!("Webserver task panicked: {}", e)),
        Err(_) => logger::warning(LogTag::Webserver, "Webserver did not stop in time"),
    }

    Ok(())
}

// =============================================================================
// WATCH
// =============================================================================

async fn run_watch(cfg: Config) -> Result<()> {
    let mut supervisor_cfg = cfg.supervisor;
    if let Some(url) = patterns::get_url() {
        supervisor_cfg.url = url;
    }

    let url = url::Url::parse(&supervisor_cfg.url)
        .with_context(|| format!("Invalid push endpoint '{}'", supervisor_cfg.url))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        bail!("Push endpoint must use ws:// or wss:// (got '{}')", supervisor_cfg.url);
    }

    logger::info(
        LogTag::System,
        &format!("Watching {}", supervisor_cfg.url),
    );

    let supervisor = Supervisor::from_config(&supervisor_cfg);
    let mut status = supervisor.subscribe();
    supervisor.start();

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    let mut last_state = ConnectionState::Idle;
    let mut last_timestamp: Option<i64> = None;

    let outcome = loop {
        tokio::select! {
            signal = &mut shutdown => break signal,
            changed = status.changed() => {
                if changed.is_err() {
                    break Err("Supervisor stopped unexpectedly".to_string());
                }
                let current = status.borrow_and_update().clone();

                if current.state != last_state {
                    print_liveness(current.state, current.reconnect_attempts);
                    last_state = current.state;
                }

                if let Some(snapshot) = &current.snapshot {
                    if last_timestamp != Some(snapshot.timestamp) {
                        print_snapshot(snapshot);
                        last_timestamp = Some(snapshot.timestamp);
                    }
                }
            }
        }
    };

    supervisor.shutdown().await;
    outcome.map_err(|e| anyhow!(e))
}

fn print_liveness(state: ConnectionState, attempts: u32) {
    let label = match state {
        ConnectionState::Open => "connected".green().bold(),
        ConnectionState::Connecting => "connecting".yellow(),
        ConnectionState::ReconnectScheduled => format!("reconnecting (attempt {})", attempts).yellow(),
        ConnectionState::Failed => "disconnected, retries exhausted".red().bold(),
        ConnectionState::Idle | ConnectionState::Closed => state.as_str().dimmed(),
    };
    println!("{} {}", "●".bold(), label);
}

fn print_snapshot(snapshot: &MetricsSnapshot) {
    let time = chrono::DateTime::from_timestamp_millis(snapshot.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let host = snapshot.host.hostname.as_deref().unwrap_or("unknown host");

    println!(
        "{} {}  cpu {:>5.1}%  mem {:>5.1}% ({} / {})  disk {:>5.1}%  load {:.2} {:.2} {:.2}",
        time.dimmed(),
        host.bold(),
        snapshot.cpu.usage_percent,
        snapshot.memory.usage_percent,
        format_bytes(snapshot.memory.used_bytes),
        format_bytes(snapshot.memory.total_bytes),
        snapshot.disk.usage_percent,
        snapshot.cpu.load_average.one,
        snapshot.cpu.load_average.five,
        snapshot.cpu.load_average.fifteen,
    );
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

// =============================================================================
// SIGNALS
// =============================================================================

/// Wait for shutdown signal (Ctrl+C, SIGTERM, SIGHUP, SIGQUIT on Unix)
async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::info(
        LogTag::System,
        "Waiting for shutdown signal (press Ctrl+C twice to force kill)",
    );

    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;
        let mut sighup =
            signal(SignalKind::hangup()).map_err(|e| format!("Failed to bind SIGHUP: {}", e))?;
        let mut sigquit =
            signal(SignalKind::quit()).map_err(|e| format!("Failed to bind SIGQUIT: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sighup.recv() => "SIGHUP",
            _ = sigquit.recv() => "SIGQUIT",
        }
    };

    #[cfg(not(unix))]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!(
            "Shutdown signal received ({}). Press Ctrl+C again to force kill.",
            signal_name
        ),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(LogTag::System, "Second Ctrl+C detected, forcing immediate exit.");
            logger::flush();
            // 130 is the conventional exit code for SIGINT
            std::process::exit(130);
        }
    });

    Ok(())
}
