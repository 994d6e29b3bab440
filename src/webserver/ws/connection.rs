/// WebSocket connection handler
///
/// One task per accepted socket:
/// - registers a hub subscriber and forwards its frames to the client
/// - answers `ping` envelopes, ignores other client traffic
/// - pings quiet clients and drops dead ones
/// - unregisters from the hub on every exit path
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

use crate::{
    arguments::is_debug_webserver_enabled,
    config::WebserverConfig,
    logger::{self, LogTag},
};

use super::{
    health::{ConnectionHealth, HealthConfig, Liveness},
    hub::{SubscriberId, WsHub},
    message::{Envelope, Payload},
    metrics::ConnectionMetrics,
};

type WsSink = SplitSink<WebSocket, Message>;

/// Per-connection limits
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Upper bound for a single socket write
    pub write_timeout: Duration,
    pub health: HealthConfig,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &WebserverConfig) -> Self {
        Self {
            write_timeout: Duration::from_millis(cfg.write_timeout_ms),
            health: HealthConfig::from_config(cfg),
        }
    }
}

/// Handle a WebSocket connection until either side goes away
pub async fn handle_connection(socket: WebSocket, hub: Arc<WsHub>, settings: ConnectionSettings) {
    let mut subscriber = hub.subscribe().await;
    let conn_id = subscriber.id();

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut health = ConnectionHealth::new(settings.health.clone());
    let metrics = ConnectionMetrics::new();

    let mut health_tick = interval(Duration::from_secs(1));
    health_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, &format!("Connection {} started", conn_id));
    }

    let reason: String = loop {
        tokio::select! {
            biased;

            // Frames from the hub
            frame = subscriber.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = send_frame(&mut ws_tx, Message::Text(frame.to_string()), settings.write_timeout).await {
                            break format!("write failed: {}", e);
                        }
                        metrics.inc_sent();
                    }
                    None => break "evicted by hub".to_string(),
                }
            }

            // Frames from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        health.on_client_frame(Instant::now());
                        metrics.inc_received();
                        if let Err(e) = handle_client_text(&text, &mut ws_tx, conn_id, settings.write_timeout).await {
                            break format!("reply failed: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break "client closed".to_string(),
                    Some(Ok(_)) => {
                        // ping/pong/binary all count as liveness
                        health.on_client_frame(Instant::now());
                    }
                    Some(Err(e)) => break format!("websocket error: {}", e),
                }
            }

            now = health_tick.tick() => {
                match health.check(now) {
                    Liveness::Alive => {}
                    Liveness::SendPing => {
                        if let Err(e) = send_frame(&mut ws_tx, Message::Ping(Vec::new()), settings.write_timeout).await {
                            break format!("ping failed: {}", e);
                        }
                        metrics.inc_pings();
                        health.on_ping_sent(Instant::now());
                    }
                    Liveness::Dead(reason) => break reason,
                }
            }
        }
    };

    hub.unsubscribe(conn_id).await;
    let _ = timeout(settings.write_timeout, ws_tx.close()).await;

    let stats = metrics.snapshot();
    logger::info(
        LogTag::Webserver,
        &format!(
            "Connection {} closed: {} (sent={}, received={}, pings={})",
            conn_id, reason, stats.frames_sent, stats.frames_received, stats.pings_sent
        ),
    );
}

/// Write one frame, bounded by `write_timeout`
async fn send_frame(ws_tx: &mut WsSink, msg: Message, write_timeout: Duration) -> Result<(), String> {
    match timeout(write_timeout, ws_tx.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}ms", write_timeout.as_millis())),
    }
}

/// Handle one text frame from the client
///
/// Malformed frames are logged and ignored; only a failed reply ends the
/// connection.
async fn handle_client_text(
    text: &str,
    ws_tx: &mut WsSink,
    conn_id: SubscriberId,
    write_timeout: Duration,
) -> Result<(), String> {
    logger::verbose(
        LogTag::Webserver,
        &format!("Connection {}: client frame: {}", conn_id, text),
    );

    let envelope = match Envelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            logger::warning(
                LogTag::Webserver,
                &format!("Connection {}: ignoring malformed frame: {}", conn_id, e),
            );
            return Ok(());
        }
    };

    match envelope.payload() {
        Ok(Payload::Ping) => {
            let pong = Envelope::pong()
                .to_json()
                .map_err(|e| format!("Serialization error: {}", e))?;
            send_frame(ws_tx, Message::Text(pong), write_timeout).await
        }
        Ok(other) => {
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!("Connection {}: ignoring client '{}' ({:?})", conn_id, envelope.kind, other),
                );
            }
            Ok(())
        }
        Err(e) => {
            logger::warning(
                LogTag::Webserver,
                &format!("Connection {}: bad '{}' payload: {}", conn_id, envelope.kind, e),
            );
            Ok(())
        }
    }
}
