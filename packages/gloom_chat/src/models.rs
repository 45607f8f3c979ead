use serde::{Deserialize, Serialize};

/// Stable, client-chosen user identifier.
pub type UserId = String;

/// Opaque handle for one accepted WebSocket connection (UUID v4).
pub type ConnectionId = String;

/// One chat utterance, with the sender's identity captured at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub nickname: String,
    pub user_id: UserId,
    pub text: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(nickname: String, user_id: UserId, text: String, timestamp: i64) -> Self {
        Self {
            nickname,
            user_id,
            text,
            timestamp,
        }
    }
}

/// Generate a fresh connection handle.
pub fn new_connection_id() -> ConnectionId {
    uuid::Uuid::new_v4().to_string()
}
