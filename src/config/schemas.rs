/// Configuration schemas - every section defined once with its defaults
use crate::config_struct;

// ============================================================================
// WEBSERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// Push server settings (`serve` command)
    pub struct WebserverConfig {
        /// Host/IP address to bind (0.0.0.0 = all interfaces)
        host: String = "127.0.0.1".to_string(),

        /// Port to bind
        port: u16 = 8080,

        /// Per-subscriber queue capacity; a subscriber whose queue fills is evicted
        subscriber_buffer: usize = 32,

        /// Maximum time a single socket write may take before the connection is dropped
        write_timeout_ms: u64 = 5000,

        /// Idle interval after which the server pings a client
        heartbeat_secs: u64 = 30,

        /// Client idle timeout (no frames received at all)
        client_idle_timeout_secs: u64 = 120,
    }
}

// ============================================================================
// SAMPLER CONFIGURATION
// ============================================================================

config_struct! {
    /// Host metrics sampling cadence
    pub struct SamplerConfig {
        /// Interval between samples
        interval_ms: u64 = 5000,

        /// Collect per-disk usage (slower on hosts with many mounts)
        include_disks: bool = true,
    }
}

// ============================================================================
// SUPERVISOR CONFIGURATION
// ============================================================================

config_struct! {
    /// Observer-side connection supervisor (`watch` command)
    pub struct SupervisorConfig {
        /// Push endpoint to connect to
        url: String = "ws://127.0.0.1:8080/ws".to_string(),

        /// Fixed delay between reconnect attempts
        reconnect_delay_ms: u64 = 3000,

        /// Automatic reconnect attempts before giving up
        max_reconnect_attempts: u32 = 5,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration (one TOML table per section)
    pub struct Config {
        webserver: WebserverConfig = WebserverConfig::default(),
        sampler: SamplerConfig = SamplerConfig::default(),
        supervisor: SupervisorConfig = SupervisorConfig::default(),
    }
}

impl Config {
    /// Reject values that would stall loops or break the transport
    pub fn validate(&self) -> Result<(), String> {
        if self.sampler.interval_ms == 0 {
            return Err("sampler.interval_ms must be greater than 0".to_string());
        }
        if self.webserver.subscriber_buffer == 0 {
            return Err("webserver.subscriber_buffer must be greater than 0".to_string());
        }
        if self.webserver.write_timeout_ms == 0 {
            return Err("webserver.write_timeout_ms must be greater than 0".to_string());
        }
        if self.webserver.heartbeat_secs == 0 {
            return Err("webserver.heartbeat_secs must be greater than 0".to_string());
        }
        if self.supervisor.reconnect_delay_ms == 0 {
            return Err("supervisor.reconnect_delay_ms must be greater than 0".to_string());
        }

        let url = url::Url::parse(&self.supervisor.url)
            .map_err(|e| format!("supervisor.url '{}' is invalid: {}", self.supervisor.url, e))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(format!(
                "supervisor.url must use ws:// or wss:// (got '{}')",
                url.scheme()
            ));
        }

        Ok(())
    }
}
