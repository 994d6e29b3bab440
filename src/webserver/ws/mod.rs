/// WebSocket broadcast layer
///
/// ## Key Components
/// - `hub`: subscriber registry and non-blocking fan-out
/// - `connection`: per-socket lifecycle (forwarding, keepalive, cleanup)
/// - `message`: `{ type, data }` envelope schema
/// - `health`: heartbeat and idle tracking
/// - `metrics`: hub and per-connection counters
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;

pub use connection::ConnectionSettings;
pub use hub::{Subscriber, SubscriberId, WsHub};
pub use message::{Envelope, Payload};
