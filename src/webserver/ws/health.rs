/// Per-connection liveness tracking
///
/// The connection task feeds client frames and sent pings in, and asks for a
/// verdict on every health tick. Time is passed in explicitly so the rules
/// can be checked against fixed instants.
use std::time::Duration;
use tokio::time::Instant;

use crate::config::WebserverConfig;

/// How long a client has to answer a server ping
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Quiet period after which the server sends a ping
    pub heartbeat_interval: Duration,
    /// No client frames for this long closes the connection
    pub idle_timeout: Duration,
    pub pong_timeout: Duration,
}

impl HealthConfig {
    pub fn from_config(cfg: &WebserverConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(cfg.heartbeat_secs),
            idle_timeout: Duration::from_secs(cfg.client_idle_timeout_secs),
            pong_timeout: PONG_TIMEOUT,
        }
    }
}

/// Outcome of a health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// Quiet for a heartbeat interval with no ping outstanding
    SendPing,
    /// Close the connection for the given reason
    Dead(String),
}

#[derive(Debug)]
pub struct ConnectionHealth {
    config: HealthConfig,
    last_client_frame: Instant,
    ping_outstanding_since: Option<Instant>,
}

impl ConnectionHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            last_client_frame: Instant::now(),
            ping_outstanding_since: None,
        }
    }

    /// Any client frame proves liveness and answers an outstanding ping
    pub fn on_client_frame(&mut self, at: Instant) {
        self.last_client_frame = at;
        self.ping_outstanding_since = None;
    }

    pub fn on_ping_sent(&mut self, at: Instant) {
        self.ping_outstanding_since = Some(at);
    }

    pub fn check(&self, now: Instant) -> Liveness {
        let quiet = now.saturating_duration_since(self.last_client_frame);
        if quiet > self.config.idle_timeout {
            return Liveness::Dead(format!("idle timeout ({}s)", quiet.as_secs()));
        }

        match self.ping_outstanding_since {
            Some(sent) if now.saturating_duration_since(sent) > self.config.pong_timeout => {
                Liveness::Dead("pong timeout".to_string())
            }
            Some(_) => Liveness::Alive,
            None if quiet > self.config.heartbeat_interval => Liveness::SendPing,
            None => Liveness::Alive,
        }
    }
}
