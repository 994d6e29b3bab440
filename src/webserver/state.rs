/// Shared application state for the webserver
///
/// Handed to every route handler through axum's `State` extractor.
use std::sync::Arc;

use crate::config::WebserverConfig;
use crate::webserver::ws::{ConnectionSettings, WsHub};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Webserver configuration
    pub config: Arc<WebserverConfig>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,

    /// Broadcast hub every `/ws` connection subscribes to
    pub ws_hub: Arc<WsHub>,
}

impl AppState {
    pub fn new(config: WebserverConfig, ws_hub: Arc<WsHub>) -> Self {
        Self {
            config: Arc::new(config),
            startup_time: chrono::Utc::now(),
            ws_hub,
        }
    }

    /// Limits applied to each accepted socket
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::from_config(&self.config)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
