//! Chat Hub
//!
//! Single task that owns the relay state. Connection handlers talk to it
//! through a cloneable `HubHandle`; events are applied strictly one at a
//! time, and outbound traffic is pushed onto each connection's queue without
//! waiting on any of them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::metrics::ServerMetrics;
use crate::models::ConnectionId;

use super::protocol::ServerMessage;
use super::state::{Delivery, RelayState, Target};

/// Outbound queue of one connection.
pub type OutboundSender = mpsc::Sender<Arc<ServerMessage>>;
pub type OutboundReceiver = mpsc::Receiver<Arc<ServerMessage>>;

/// Commands that can be sent to the hub
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        connection_id: ConnectionId,
        outbound: OutboundSender,
    },
    Join {
        connection_id: ConnectionId,
        user_id: String,
        nickname: String,
    },
    Message {
        connection_id: ConnectionId,
        text: Option<String>,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    GetStats {
        respond_to: oneshot::Sender<HubStats>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub active_users: usize,
    pub connections: usize,
    pub history_len: usize,
    pub history_capacity: usize,
}

/// Handle to communicate with the hub
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn send(&self, cmd: HubCommand) -> Result<()> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RelayError::HubUnavailable)
    }

    /// Attach a connection so it receives broadcasts.
    pub async fn connect(&self, connection_id: &str, outbound: OutboundSender) -> Result<()> {
        self.send(HubCommand::Connect {
            connection_id: connection_id.to_string(),
            outbound,
        })
        .await
    }

    pub async fn join(&self, connection_id: &str, user_id: String, nickname: String) -> Result<()> {
        self.send(HubCommand::Join {
            connection_id: connection_id.to_string(),
            user_id,
            nickname,
        })
        .await
    }

    pub async fn message(&self, connection_id: &str, text: Option<String>) -> Result<()> {
        self.send(HubCommand::Message {
            connection_id: connection_id.to_string(),
            text,
        })
        .await
    }

    pub async fn disconnect(&self, connection_id: &str) -> Result<()> {
        self.send(HubCommand::Disconnect {
            connection_id: connection_id.to_string(),
        })
        .await
    }

    pub async fn stats(&self) -> Result<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::GetStats { respond_to: tx }).await?;
        rx.await.map_err(|_| RelayError::HubUnavailable)
    }
}

pub struct ChatHub {
    receiver: mpsc::Receiver<HubCommand>,
    state: RelayState,
    connections: HashMap<ConnectionId, OutboundSender>,
    metrics: Arc<ServerMetrics>,
    last_timestamp: i64,
}

impl ChatHub {
    /// Spawn the hub task and return a handle to it. The task exits once
    /// every handle has been dropped.
    pub fn spawn(config: &RelayConfig, metrics: Arc<ServerMetrics>) -> HubHandle {
        let (sender, receiver) = mpsc::channel(config.command_channel_capacity);
        let hub = ChatHub {
            receiver,
            state: RelayState::new(config.history_limit),
            connections: HashMap::new(),
            metrics,
            last_timestamp: 0,
        };
        tokio::spawn(hub.run());
        HubHandle { sender }
    }

    async fn run(mut self) {
        info!(
            history_limit = self.state.stats().history_capacity,
            "Chat hub started"
        );
        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd);
        }
        debug!("Chat hub stopped (all handles dropped)");
    }

    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect {
                connection_id,
                outbound,
            } => {
                self.connections.insert(connection_id, outbound);
            }
            HubCommand::Join {
                connection_id,
                user_id,
                nickname,
            } => {
                let deliveries = self.state.join(&connection_id, &user_id, &nickname);
                self.metrics.user_joined();
                self.deliver(deliveries);
            }
            HubCommand::Message {
                connection_id,
                text,
            } => {
                let timestamp = self.next_timestamp();
                let deliveries = self.state.message(&connection_id, text, timestamp);
                if deliveries.is_empty() {
                    self.metrics.message_ignored();
                } else {
                    self.metrics.message_relayed();
                }
                self.deliver(deliveries);
            }
            HubCommand::Disconnect { connection_id } => {
                self.connections.remove(&connection_id);
                let deliveries = self.state.disconnect(&connection_id);
                if !deliveries.is_empty() {
                    self.metrics.user_left();
                }
                self.deliver(deliveries);
            }
            HubCommand::GetStats { respond_to } => {
                let stats = self.state.stats();
                let _ = respond_to.send(HubStats {
                    active_users: stats.active_users,
                    connections: self.connections.len(),
                    history_len: stats.history_len,
                    history_capacity: stats.history_capacity,
                });
            }
        }
    }

    /// Wall-clock millis, clamped so stored messages never go back in time.
    fn next_timestamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_timestamp = self.last_timestamp.max(now);
        self.last_timestamp
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            let message = Arc::new(delivery.message);
            match delivery.target {
                Target::All => {
                    for (connection_id, outbound) in &self.connections {
                        try_deliver(&self.metrics, connection_id, outbound, message.clone());
                    }
                }
                Target::Connection(connection_id) => {
                    if let Some(outbound) = self.connections.get(&connection_id) {
                        try_deliver(&self.metrics, &connection_id, outbound, message);
                    }
                }
            }
        }
    }
}

/// Fire-and-forget: a full or closed queue loses this one message only.
fn try_deliver(
    metrics: &ServerMetrics,
    connection_id: &str,
    outbound: &OutboundSender,
    message: Arc<ServerMessage>,
) {
    match outbound.try_send(message) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            metrics.delivery_dropped();
            warn!(conn = %connection_id, "Outbound queue full, dropping message");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(conn = %connection_id, "Outbound queue closed");
        }
    }
}
