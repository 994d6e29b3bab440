/// Observer-side connection supervisor
///
/// Keeps one push channel to the server alive: connects on `start`, retries
/// with a fixed delay up to a bounded number of attempts, exposes liveness
/// and the latest `systemStats` snapshot through a `watch` channel.
///
/// - `machine`: pure state machine (`ReconnectMachine::handle`)
/// - `actor`: the supervisor task and its `Supervisor` handle
/// - `transport`: `Connector`/`Transport` seam and the WebSocket client
/// - `status`: the observable status value
mod actor;
pub mod machine;
mod status;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use actor::Supervisor;
pub use machine::{ConnectionState, ReconnectPolicy};
pub use status::SupervisorStatus;
pub use transport::{Connector, Transport, WsConnector};
