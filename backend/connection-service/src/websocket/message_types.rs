use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Inbound WebSocket events from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "typing")]
    Typing { other_user_id: Uuid },

    #[serde(rename = "stop-typing")]
    StopTyping { other_user_id: Uuid },

    #[serde(rename = "join-conversation")]
    JoinConversation { other_user_id: Uuid },

    #[serde(rename = "leave-conversation")]
    LeaveConversation { other_user_id: Uuid },
}

/// Outbound WebSocket events from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    /// A message was persisted in one of the client's connections.
    /// Delivered on both the personal channel and the conversation room;
    /// clients deduplicate by `message.id`.
    #[serde(rename = "new-message")]
    NewMessage {
        message: Message,
        connection_id: Uuid,
    },

    #[serde(rename = "typing")]
    Typing { from_user_id: Uuid },

    #[serde(rename = "stop-typing")]
    StopTyping { from_user_id: Uuid },

    #[serde(rename = "user-online")]
    UserOnline { user_id: Uuid },

    #[serde(rename = "user-offline")]
    UserOffline { user_id: Uuid },
}

impl WsOutboundEvent {
    /// Serialize for the wire. Event construction is fully under our
    /// control, so serialization cannot fail in practice.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize outbound ws event");
            String::new()
        })
    }
}
