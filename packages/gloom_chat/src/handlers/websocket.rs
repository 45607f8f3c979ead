use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::relay;
use crate::server::AppState;

/// Chat WebSocket handler - one connection per client, single shared room
pub async fn chat_websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hub.clone();
    let metrics = state.metrics.clone();
    let send_channel_capacity = state.relay_config.send_channel_capacity;

    ws.on_upgrade(move |socket| {
        relay::handle_chat_ws(socket, hub, metrics, send_channel_capacity)
    })
}
