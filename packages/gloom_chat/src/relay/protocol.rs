//! WebSocket Protocol Types
//!
//! JSON frames exchanged with chat clients. Every frame carries a `type` tag;
//! payload fields are camelCase.

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// Messages sent FROM the client TO the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Announce (or re-announce) who this connection speaks for.
    /// `user-ready` is accepted as another tag for the same object.
    #[serde(alias = "user-ready")]
    Join { user_id: String, nickname: String },
    /// Post a message to the room. Absent or empty text is dropped.
    /// `send-message` is accepted as another tag; the text still travels in
    /// the `text` field.
    #[serde(alias = "send-message")]
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// Messages sent FROM the server TO the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Recent messages, oldest first. Unicast to a connection right after it joins.
    History { messages: Vec<ChatMessage> },
    /// A user joined (nickname)
    UserJoin { nickname: String },
    /// A user left (nickname)
    UserLeave { nickname: String },
    /// Number of registered users
    ActiveUsers { count: usize },
    /// A relayed chat message
    ChatMessage(ChatMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_join() {
        let json = r#"{"type":"join","userId":"u1","nickname":"Ann"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                user_id: "u1".to_string(),
                nickname: "Ann".to_string(),
            }
        );
    }

    #[test]
    fn test_client_message_join_alternate_tag() {
        let json = r#"{"type":"user-ready","userId":"u1","nickname":"Ann"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Join { .. }));
    }

    #[test]
    fn test_client_message_join_missing_nickname() {
        let json = r#"{"type":"join","userId":"u1"}"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_message_text() {
        let json = r#"{"type":"message","text":"hi"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Message {
                text: Some("hi".to_string())
            }
        );
    }

    #[test]
    fn test_send_message_tag_takes_object_form() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"send-message","text":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Message {
                text: Some("hi".into())
            }
        );

        // A bare string payload is not a frame
        assert!(serde_json::from_str::<ClientMessage>(r#""hi""#).is_err());
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"send-message","data":"hi"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Message { text: None });
    }

    #[test]
    fn test_client_message_text_absent_or_null() {
        for json in [
            r#"{"type":"message"}"#,
            r#"{"type":"send-message","text":null}"#,
        ] {
            let msg: ClientMessage = serde_json::from_str(json).unwrap();
            assert_eq!(msg, ClientMessage::Message { text: None });
        }
    }

    #[test]
    fn test_client_message_unknown_type() {
        let json = r#"{"type":"typing","userId":"u1"}"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_history_serialization() {
        let msg = ServerMessage::History {
            messages: vec![ChatMessage::new("Ann".into(), "u1".into(), "hi".into(), 7)],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "history");
        assert_eq!(json["messages"][0]["userId"], "u1");
        assert_eq!(json["messages"][0]["text"], "hi");
    }

    #[test]
    fn test_server_message_empty_history() {
        let json = serde_json::to_string(&ServerMessage::History { messages: vec![] }).unwrap();
        assert_eq!(json, r#"{"type":"history","messages":[]}"#);
    }

    #[test]
    fn test_server_message_presence_serialization() {
        let join = serde_json::to_string(&ServerMessage::UserJoin {
            nickname: "Ann".into(),
        })
        .unwrap();
        assert_eq!(join, r#"{"type":"user-join","nickname":"Ann"}"#);

        let leave = serde_json::to_string(&ServerMessage::UserLeave {
            nickname: "Ann".into(),
        })
        .unwrap();
        assert_eq!(leave, r#"{"type":"user-leave","nickname":"Ann"}"#);

        let count = serde_json::to_string(&ServerMessage::ActiveUsers { count: 2 }).unwrap();
        assert_eq!(count, r#"{"type":"active-users","count":2}"#);
    }

    #[test]
    fn test_server_message_chat_message_is_flat() {
        let msg = ServerMessage::ChatMessage(ChatMessage::new(
            "Ann".into(),
            "u1".into(),
            "hi".into(),
            1_700_000_000_000,
        ));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "chat-message");
        assert_eq!(json["nickname"], "Ann");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);

        let back: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
