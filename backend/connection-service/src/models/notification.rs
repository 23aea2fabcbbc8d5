use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone sent a connection request
    ConnectionRequest,
    /// A connection request was accepted (connection created/reactivated)
    ConnectionAccepted,
    /// A connection request was rejected
    ConnectionRejected,
    /// A new message arrived in a connection
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ConnectionRequest => "connection_request",
            NotificationKind::ConnectionAccepted => "connection_accepted",
            NotificationKind::ConnectionRejected => "connection_rejected",
            NotificationKind::NewMessage => "new_message",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "connection_request" => Some(NotificationKind::ConnectionRequest),
            "connection_accepted" => Some(NotificationKind::ConnectionAccepted),
            "connection_rejected" => Some(NotificationKind::ConnectionRejected),
            "new_message" => Some(NotificationKind::NewMessage),
            _ => None,
        }
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = crate::error::AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_db(&s).ok_or_else(|| {
            crate::error::AppError::Database(format!("unknown notification kind: {s}"))
        })
    }
}

/// A user-facing notification record. Created as a best-effort side effect
/// of connection and message transitions; never created when the target is
/// the originator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub target_user_id: Uuid,
    pub from_user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub message: String,
    pub related_id: Option<Uuid>,
    pub related_kind: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_db_strings() {
        for kind in [
            NotificationKind::ConnectionRequest,
            NotificationKind::ConnectionAccepted,
            NotificationKind::ConnectionRejected,
            NotificationKind::NewMessage,
        ] {
            assert_eq!(NotificationKind::from_db(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::from_db("like"), None);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::ConnectionAccepted).unwrap();
        assert_eq!(json, "\"connection_accepted\"");
    }
}
