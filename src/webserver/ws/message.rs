/// WebSocket message schema
///
/// Every frame on `/ws` is a JSON envelope:
///
/// ```json
/// { "type": "systemStats", "data": { "cpu": { ... }, "timestamp": 1700000000000 } }
/// ```
///
/// `type` discriminates the payload. Receivers ignore types they do not
/// know, so new message kinds can be added without breaking old observers.
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

// ============================================================================
// MESSAGE TYPES
// ============================================================================

/// Host metrics broadcast (server → observers)
pub const SYSTEM_STATS: &str = "systemStats";

/// Keepalive request (observer → server)
pub const PING: &str = "ping";

/// Keepalive reply (server → the requesting observer only)
pub const PONG: &str = "pong";

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Payload discriminator
    #[serde(rename = "type")]
    pub kind: String,

    /// Payload (type-specific, opaque to the transport)
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Known inbound payloads, after dispatch on `type`
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    SystemStats(MetricsSnapshot),
    Ping,
    Pong,
    /// Forward-compatible: a type this build does not understand
    Unknown(String),
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Wrap a metrics snapshot
    pub fn system_stats(snapshot: &MetricsSnapshot) -> Result<Self, serde_json::Error> {
        Ok(Self::new(SYSTEM_STATS, serde_json::to_value(snapshot)?))
    }

    pub fn ping() -> Self {
        Self::new(PING, serde_json::Value::Null)
    }

    pub fn pong() -> Self {
        Self::new(PONG, serde_json::Value::Null)
    }

    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode the payload according to `type`
    ///
    /// Fails only when a known type carries a payload of the wrong shape.
    pub fn payload(&self) -> Result<Payload, serde_json::Error> {
        match self.kind.as_str() {
            SYSTEM_STATS => Ok(Payload::SystemStats(serde_json::from_value(
                self.data.clone(),
            )?)),
            PING => Ok(Payload::Ping),
            PONG => Ok(Payload::Pong),
            other => Ok(Payload::Unknown(other.to_string())),
        }
    }
}
