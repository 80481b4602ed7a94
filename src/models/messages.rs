use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl std::str::FromStr for MessageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "video" => Ok(MessageType::Video),
            "audio" => Ok(MessageType::Audio),
            "document" => Ok(MessageType::Document),
            other => Err(anyhow::anyhow!("Unknown message type: {}", other)),
        }
    }
}

/// Where a message is delivered. A message has exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Direct { receiver_id: i64 },
    Group { group_id: i64 },
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub message_type: MessageType,
    pub content: String,
    pub file_path: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    pub fn addressing(&self) -> Option<Addressing> {
        match (self.receiver_id, self.group_id) {
            (Some(receiver_id), None) => Some(Addressing::Direct { receiver_id }),
            (None, Some(group_id)) => Some(Addressing::Group { group_id }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: i64,
    pub addressing: Addressing,
    pub message_type: MessageType,
    pub content: String,
    pub file_path: Option<String>,
}
