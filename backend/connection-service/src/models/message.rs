use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message payload kind. `Media` carries an opaque storage reference in
/// `content`; this service never touches the media itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Media,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Media => "media",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "media" => Some(MessageKind::Media),
            _ => None,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

impl TryFrom<String> for MessageKind {
    type Error = crate::error::AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_db(&s)
            .ok_or_else(|| crate::error::AppError::Database(format!("unknown message kind: {s}")))
    }
}

/// A message scoped to a mutual connection. Sender and receiver are always
/// the two members of the connection; immutable after insert except for
/// the read receipt fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub kind: MessageKind,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageKind::Text).unwrap(), "\"text\"");
        assert_eq!(serde_json::to_string(&MessageKind::Media).unwrap(), "\"media\"");
    }

    #[test]
    fn kind_round_trips_through_db_strings() {
        for kind in [MessageKind::Text, MessageKind::Media] {
            assert_eq!(MessageKind::from_db(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_db("audio"), None);
    }
}
