use crate::models::messages::MessageType;
use chrono::{DateTime, Utc};

/// Events sent by a client over its websocket, tagged by `event`.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    PrivateMessage {
        receiver_id: i64,
        message: String,
        #[serde(rename = "type", default)]
        message_type: MessageType,
        #[serde(default)]
        file_path: Option<String>,
    },
    GroupMessage {
        group_id: String,
        message: String,
        #[serde(rename = "type", default)]
        message_type: MessageType,
        #[serde(default)]
        file_path: Option<String>,
    },
    Typing {
        #[serde(default)]
        receiver_id: Option<i64>,
        #[serde(default)]
        group_id: Option<String>,
        typing: bool,
    },
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

/// Events pushed to connected clients, tagged by `event`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    UserStatus {
        user_id: i64,
        status: Presence,
    },
    NewMessage {
        id: i64,
        sender_id: i64,
        sender_name: String,
        content: String,
        timestamp: DateTime<Utc>,
        #[serde(rename = "type")]
        message_type: MessageType,
        file_path: Option<String>,
    },
    MessageSent {
        id: i64,
        timestamp: DateTime<Utc>,
    },
    NewGroupMessage {
        id: i64,
        group_id: String,
        sender_id: i64,
        sender_name: String,
        content: String,
        timestamp: DateTime<Utc>,
        #[serde(rename = "type")]
        message_type: MessageType,
        file_path: Option<String>,
    },
    UserTyping {
        user_id: i64,
        user_name: String,
        typing: bool,
    },
    GroupTyping {
        group_id: String,
        user_id: i64,
        user_name: String,
        typing: bool,
    },
    Error {
        message: String,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_message_defaults_to_text() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"private_message","receiver_id":2,"message":"hi"}"#)
                .unwrap();
        match event {
            ClientEvent::PrivateMessage {
                receiver_id,
                message,
                message_type,
                file_path,
            } => {
                assert_eq!(receiver_id, 2);
                assert_eq!(message, "hi");
                assert_eq!(message_type, MessageType::Text);
                assert!(file_path.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn typing_accepts_group_target() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"typing","group_id":"group_ab12cd34","typing":true}"#)
                .unwrap();
        assert!(matches!(
            event,
            ClientEvent::Typing { receiver_id: None, group_id: Some(ref g), typing: true } if g == "group_ab12cd34"
        ));
    }

    #[test]
    fn server_events_carry_event_tag() {
        let json = serde_json::to_value(ServerEvent::UserStatus {
            user_id: 7,
            status: Presence::Online,
        })
        .unwrap();
        assert_eq!(json["event"], "user_status");
        assert_eq!(json["status"], "online");
    }
}
