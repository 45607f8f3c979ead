//! WebSocket Handler
//!
//! One task per client connection: decodes inbound frames into hub commands
//! and drains the connection's outbound queue onto the socket.

use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::metrics::ServerMetrics;
use crate::models::new_connection_id;

use super::hub::HubHandle;
use super::protocol::{ClientMessage, ServerMessage};

/// Handle a chat WebSocket connection until the client goes away
pub async fn handle_chat_ws(
    socket: WebSocket,
    hub: HubHandle,
    metrics: Arc<ServerMetrics>,
    send_channel_capacity: usize,
) {
    let connection_id = new_connection_id();
    info!(conn = %connection_id, "New chat WebSocket connection");
    metrics.connection_opened();

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for messages to this client
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(send_channel_capacity);

    if hub.connect(&connection_id, tx).await.is_err() {
        error!(conn = %connection_id, "Chat hub unavailable, closing connection");
        metrics.connection_closed();
        return;
    }

    // Task to send messages to WebSocket
    let sender_task = async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(msg.as_ref()) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    };

    // Task to handle incoming messages
    let hub_input = hub.clone();
    let metrics_input = metrics.clone();
    let conn_input = connection_id.clone();
    let input_task = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(m) => m,
                        Err(e) => {
                            debug!(conn = %conn_input, "Ignoring unparseable frame: {}", e);
                            metrics_input.message_ignored();
                            continue;
                        }
                    };
                    let sent = match client_msg {
                        ClientMessage::Join { user_id, nickname } => {
                            hub_input.join(&conn_input, user_id, nickname).await
                        }
                        ClientMessage::Message { text } => {
                            hub_input.message(&conn_input, text).await
                        }
                    };
                    if sent.is_err() {
                        warn!(conn = %conn_input, "Chat hub gone, dropping connection");
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    debug!("Binary messages not supported");
                    metrics_input.message_ignored();
                }
                Ok(Message::Close(_)) => {
                    debug!("Client closed connection");
                    break;
                }
                Err(e) => {
                    debug!(conn = %conn_input, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = sender_task => debug!("Sender task ended"),
        _ = input_task => debug!("Input task ended"),
    }

    if hub.disconnect(&connection_id).await.is_err() {
        warn!(conn = %connection_id, "Chat hub gone before disconnect was recorded");
    }
    metrics.connection_closed();
    info!(conn = %connection_id, "Chat WebSocket connection closed");
}
