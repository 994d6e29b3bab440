//! hostpulse - live host telemetry over WebSocket
//!
//! Server side: `sampler` takes a `metrics` snapshot on a fixed cadence and
//! broadcasts it through the `webserver::ws` hub to every `/ws` observer.
//! Observer side: `supervisor` keeps one connection alive with bounded
//! fixed-delay reconnects and exposes the latest snapshot.

pub mod arguments;
pub mod config;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod paths;
pub mod run;
pub mod sampler;
pub mod supervisor;
pub mod webserver;
