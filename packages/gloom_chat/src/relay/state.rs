//! Relay State
//!
//! Applies one client lifecycle event (join, message, disconnect) to the
//! session registry and history buffer, and describes the resulting outbound
//! traffic as a list of deliveries. Delivery itself happens in the hub.

use tracing::{debug, info};

use crate::history::HistoryBuffer;
use crate::models::{ChatMessage, ConnectionId};
use crate::registry::SessionRegistry;

use super::protocol::ServerMessage;

/// Who an outbound message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every connected client, including the originator
    All,
    /// Exactly one connection
    Connection(ConnectionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: Target,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn broadcast(message: ServerMessage) -> Self {
        Self {
            target: Target::All,
            message,
        }
    }

    pub fn unicast(connection_id: &str, message: ServerMessage) -> Self {
        Self {
            target: Target::Connection(connection_id.to_string()),
            message,
        }
    }
}

/// Point-in-time view of relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub active_users: usize,
    pub history_len: usize,
    pub history_capacity: usize,
}

pub struct RelayState {
    registry: SessionRegistry,
    history: HistoryBuffer,
}

impl RelayState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            registry: SessionRegistry::new(),
            history: HistoryBuffer::new(history_limit),
        }
    }

    /// A connection announced itself. The joiner receives the history first,
    /// then everyone hears about the join and the new head count.
    pub fn join(&mut self, connection_id: &str, user_id: &str, nickname: &str) -> Vec<Delivery> {
        if let Some(old) = self.registry.register(user_id, nickname, connection_id) {
            if old.connection_id != connection_id {
                info!(
                    user = %user_id,
                    old_conn = %old.connection_id,
                    new_conn = %connection_id,
                    "Session superseded by newer connection"
                );
            }
        }
        info!(user = %user_id, conn = %connection_id, "{} joined", nickname);

        vec![
            Delivery::unicast(
                connection_id,
                ServerMessage::History {
                    messages: self.history.snapshot(),
                },
            ),
            Delivery::broadcast(ServerMessage::UserJoin {
                nickname: nickname.to_string(),
            }),
            self.active_users(),
        ]
    }

    /// A connection posted text. Dropped silently if the connection has no
    /// session or the text is empty.
    pub fn message(
        &mut self,
        connection_id: &str,
        text: Option<String>,
        timestamp: i64,
    ) -> Vec<Delivery> {
        let Some(sender) = self.registry.lookup_by_connection(connection_id) else {
            debug!(conn = %connection_id, "Dropping message from unregistered connection");
            return Vec::new();
        };
        let text = match text {
            Some(text) if !text.is_empty() => text,
            _ => {
                debug!(conn = %connection_id, "Dropping empty message");
                return Vec::new();
            }
        };

        let message = ChatMessage::new(
            sender.nickname.clone(),
            sender.user_id.clone(),
            text,
            timestamp,
        );
        self.history.append(message.clone());

        vec![Delivery::broadcast(ServerMessage::ChatMessage(message))]
    }

    /// A connection went away. Only a connection that still owns a session
    /// produces a leave announcement.
    pub fn disconnect(&mut self, connection_id: &str) -> Vec<Delivery> {
        let Some(user_id) = self
            .registry
            .lookup_by_connection(connection_id)
            .map(|s| s.user_id.clone())
        else {
            info!(conn = %connection_id, "Unregistered connection closed");
            return Vec::new();
        };
        let Some(session) = self.registry.remove(&user_id) else {
            return Vec::new();
        };
        info!(user = %session.user_id, conn = %connection_id, "{} left", session.nickname);

        vec![
            Delivery::broadcast(ServerMessage::UserLeave {
                nickname: session.nickname,
            }),
            self.active_users(),
        ]
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            active_users: self.registry.active_count(),
            history_len: self.history.len(),
            history_capacity: self.history.capacity(),
        }
    }

    fn active_users(&self) -> Delivery {
        Delivery::broadcast(ServerMessage::ActiveUsers {
            count: self.registry.active_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_000_000;

    fn texts(state: &RelayState) -> Vec<String> {
        state
            .history
            .snapshot()
            .into_iter()
            .map(|m| m.text)
            .collect()
    }

    #[test]
    fn join_on_empty_buffer() {
        let mut state = RelayState::new(30);
        let out = state.join("conn-1", "u1", "Ann");

        assert_eq!(
            out,
            vec![
                Delivery::unicast("conn-1", ServerMessage::History { messages: vec![] }),
                Delivery::broadcast(ServerMessage::UserJoin {
                    nickname: "Ann".into()
                }),
                Delivery::broadcast(ServerMessage::ActiveUsers { count: 1 }),
            ]
        );
    }

    #[test]
    fn message_from_registered_user_is_broadcast_and_stored() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");

        let out = state.message("conn-1", Some("hi".into()), T);
        assert_eq!(
            out,
            vec![Delivery::broadcast(ServerMessage::ChatMessage(
                ChatMessage::new("Ann".into(), "u1".into(), "hi".into(), T)
            ))]
        );
        assert_eq!(texts(&state), vec!["hi"]);
    }

    #[test]
    fn message_from_unregistered_connection_is_dropped() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        state.message("conn-1", Some("first".into()), T);

        let out = state.message("conn-2", Some("intruder".into()), T + 1);
        assert!(out.is_empty());
        assert_eq!(texts(&state), vec!["first"]);
    }

    #[test]
    fn empty_or_absent_text_is_dropped() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");

        assert!(state.message("conn-1", Some(String::new()), T).is_empty());
        assert!(state.message("conn-1", None, T).is_empty());
        assert!(state.history.is_empty());
    }

    #[test]
    fn history_overflow_keeps_last_thirty() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        for n in 1..=31 {
            state.message("conn-1", Some(format!("m{n}")), T + n);
        }

        let out = state.join("conn-2", "u2", "Bob");
        match &out[0] {
            Delivery {
                target: Target::Connection(conn),
                message: ServerMessage::History { messages },
            } => {
                assert_eq!(conn, "conn-2");
                assert_eq!(messages.len(), 30);
                assert_eq!(messages[0].text, "m2");
                assert_eq!(messages[29].text, "m31");
            }
            other => panic!("Expected history unicast, got {other:?}"),
        }
    }

    #[test]
    fn disconnect_announces_leave_once() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");

        let out = state.disconnect("conn-1");
        assert_eq!(
            out,
            vec![
                Delivery::broadcast(ServerMessage::UserLeave {
                    nickname: "Ann".into()
                }),
                Delivery::broadcast(ServerMessage::ActiveUsers { count: 0 }),
            ]
        );

        assert!(state.disconnect("conn-1").is_empty());
    }

    #[test]
    fn disconnect_of_unregistered_connection_is_silent() {
        let mut state = RelayState::new(30);
        assert!(state.disconnect("conn-9").is_empty());
    }

    #[test]
    fn superseded_connection_loses_its_voice() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        let out = state.join("conn-2", "u1", "Annie");
        assert_eq!(
            out[2],
            Delivery::broadcast(ServerMessage::ActiveUsers { count: 1 })
        );

        assert!(state.message("conn-1", Some("stale".into()), T).is_empty());
        assert!(state.disconnect("conn-1").is_empty());
        assert_eq!(state.stats().active_users, 1);

        let out = state.message("conn-2", Some("fresh".into()), T);
        match &out[0].message {
            ServerMessage::ChatMessage(m) => assert_eq!(m.nickname, "Annie"),
            other => panic!("Expected chat message, got {other:?}"),
        }
    }

    #[test]
    fn stored_messages_keep_sender_snapshot() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        state.message("conn-1", Some("before".into()), T);
        state.join("conn-1", "u1", "Annie");

        let snapshot = state.history.snapshot();
        assert_eq!(snapshot[0].nickname, "Ann");
    }

    #[test]
    fn active_count_tracks_distinct_users() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        state.join("conn-2", "u2", "Bob");
        state.join("conn-3", "u1", "Ann");
        assert_eq!(state.stats().active_users, 2);

        state.disconnect("conn-2");
        assert_eq!(state.stats().active_users, 1);
    }

    #[test]
    fn second_user_id_on_one_connection_keeps_the_first() {
        let mut state = RelayState::new(30);
        state.join("conn-1", "u1", "Ann");
        let out = state.join("conn-1", "u2", "Bob");
        assert_eq!(
            out,
            vec![
                Delivery::unicast("conn-1", ServerMessage::History { messages: vec![] }),
                Delivery::broadcast(ServerMessage::UserJoin {
                    nickname: "Bob".into()
                }),
                Delivery::broadcast(ServerMessage::ActiveUsers { count: 2 }),
            ]
        );

        // The earliest session answers for the connection
        let out = state.message("conn-1", Some("hi".into()), T);
        match &out[0].message {
            ServerMessage::ChatMessage(m) => assert_eq!(m.user_id, "u1"),
            other => panic!("Expected chat message, got {other:?}"),
        }

        let out = state.disconnect("conn-1");
        assert_eq!(
            out,
            vec![
                Delivery::broadcast(ServerMessage::UserLeave {
                    nickname: "Ann".into()
                }),
                Delivery::broadcast(ServerMessage::ActiveUsers { count: 1 }),
            ]
        );
        assert_eq!(state.stats().active_users, 1);
    }
}
