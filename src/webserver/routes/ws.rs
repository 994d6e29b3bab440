/// WebSocket endpoint
///
/// Upgrades `/ws` and hands the socket to the connection handler, which
/// registers it with the hub for the lifetime of the socket.
use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_upgrade))
}

/// GET /ws
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, "WebSocket upgrade requested");
    }

    let hub = Arc::clone(&state.ws_hub);
    let settings = state.connection_settings();
    ws.on_upgrade(move |socket| handle_connection(socket, hub, settings))
}
