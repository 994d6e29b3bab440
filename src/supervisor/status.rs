use serde::Serialize;

use super::machine::ConnectionState;
use crate::metrics::MetricsSnapshot;

/// Observable supervisor state, published through a `watch` channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStatus {
    pub state: ConnectionState,
    /// Liveness flag: true only while `Open`
    pub connected: bool,
    pub reconnect_attempts: u32,
    /// Latest `systemStats` payload; kept across reconnects, cleared by stop
    pub snapshot: Option<MetricsSnapshot>,
}

impl Default for SupervisorStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            connected: false,
            reconnect_attempts: 0,
            snapshot: None,
        }
    }
}
