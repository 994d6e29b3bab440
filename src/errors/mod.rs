/// Error types for hostpulse
///
/// None of these escape the telemetry core: the sampler logs `SourceError`
/// and keeps ticking, the supervisor turns `TransportError` into state
/// transitions. They exist so failures carry structured context into logs.
use thiserror::Error;

/// Failure to obtain a metrics snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Snapshot collection failed: {0}")] Collection(String),

    #[error("Snapshot collection timed out after {millis}ms")] Timeout {
        millis: u64,
    },

    #[error("Snapshot worker panicked or was cancelled: {0}")] Worker(String),
}

/// Failure on the observer's push channel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {reason}")] Connect {
        url: String,
        reason: String,
    },

    #[error("Send failed: {0}")] Send(String),

    #[error("Receive failed: {0}")] Receive(String),

    #[error("Connection closed: {0}")] Closed(String),
}

impl TransportError {
    /// Short label used in state-change logs
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "connect",
            TransportError::Send(_) => "send",
            TransportError::Receive(_) => "receive",
            TransportError::Closed(_) => "closed",
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")] Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")] Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")] Invalid(String),

    #[error("Config already initialized")] AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = TransportError::Connect {
            url: "ws://127.0.0.1:9/ws".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(err.kind(), "connect");
        assert!(err.to_string().contains("ws://127.0.0.1:9/ws"));

        let err = SourceError::Timeout { millis: 5000 };
        assert_eq!(err.to_string(), "Snapshot collection timed out after 5000ms");
    }
}
