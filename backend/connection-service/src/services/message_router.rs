use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageKind, MutualConnection, NotificationKind};
use crate::services::notification_emitter::NotificationEmitter;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::PresenceRegistry;

/// A connection with its latest message and the caller's unread count,
/// for the conversation list.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub connection: MutualConnection,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

/// Validates, persists, and fans out messages within a connection; serves
/// paginated history and unread counts. A message is durably persisted
/// before any real-time delivery attempt.
#[derive(Clone)]
pub struct MessageRouter {
    pool: PgPool,
    presence: PresenceRegistry,
    notifier: NotificationEmitter,
}

impl MessageRouter {
    pub fn new(pool: PgPool, presence: PresenceRegistry, notifier: NotificationEmitter) -> Self {
        Self {
            pool,
            presence,
            notifier,
        }
    }

    /// Persist a message and push it live. Delivery is deliberately
    /// redundant: once to the receiver's personal session if online, once
    /// to the canonical room (covers both members viewing the
    /// conversation). Clients deduplicate by message id.
    pub async fn send(
        &self,
        sender_id: Uuid,
        connection_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> AppResult<Message> {
        let connection = self.load_connection(connection_id).await?;
        if !connection.is_member(sender_id) {
            return Err(AppError::Forbidden);
        }
        if content.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "message content cannot be empty".to_string(),
            ));
        }

        let receiver_id = connection.other_member(sender_id);

        let message: Message = sqlx::query_as(
            r#"
            INSERT INTO messages
                (id, connection_id, sender_id, receiver_id, content, kind, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW())
            RETURNING id, connection_id, sender_id, receiver_id, content, kind, is_read,
                      read_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(connection_id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        let payload = WsOutboundEvent::NewMessage {
            message: message.clone(),
            connection_id,
        }
        .to_payload();

        if self.presence.is_online(receiver_id).await {
            self.presence.send_to_user(receiver_id, &payload).await;
        }
        self.presence
            .broadcast_room(&connection.canonical_id, &payload, None)
            .await;

        self.notifier
            .emit_or_log(
                receiver_id,
                sender_id,
                NotificationKind::NewMessage,
                "sent you a message",
                Some(message.id),
                Some("message"),
            )
            .await;

        tracing::debug!(
            message_id = %message.id,
            %connection_id,
            %sender_id,
            "message persisted and fanned out"
        );

        Ok(message)
    }

    /// A page of history in chronological order. Fetches the most recent
    /// `page_size` rows newest-first and reverses them. Side effect: all
    /// unread messages addressed to the requester in this connection are
    /// marked read in bulk. Offset pagination can skip or duplicate a row
    /// when inserts race the scan; accepted limitation.
    pub async fn history(
        &self,
        connection_id: Uuid,
        requester_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> AppResult<Vec<Message>> {
        let connection = self.load_connection(connection_id).await?;
        if !connection.is_member(requester_id) {
            return Err(AppError::Forbidden);
        }

        let (page_size, offset) = super::page_offset(page, page_size);

        let mut messages: Vec<Message> = sqlx::query_as(
            r#"
            SELECT id, connection_id, sender_id, receiver_id, content, kind, is_read,
                   read_at, created_at
            FROM messages
            WHERE connection_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(connection_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        messages.reverse();

        self.mark_read(connection_id, requester_id).await?;

        Ok(messages)
    }

    /// Recomputed per call, not cached.
    pub async fn unread_count(&self, connection_id: Uuid, requester_id: Uuid) -> AppResult<i64> {
        let connection = self.load_connection(connection_id).await?;
        if !connection.is_member(requester_id) {
            return Err(AppError::Forbidden);
        }

        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE connection_id = $1 AND receiver_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(connection_id)
        .bind(requester_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Bulk read receipt; idempotent. Returns the number of rows updated.
    pub async fn mark_read(&self, connection_id: Uuid, requester_id: Uuid) -> AppResult<u64> {
        let affected = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = NOW()
            WHERE connection_id = $1 AND receiver_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(connection_id)
        .bind(requester_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    /// The caller's active connections with last-message preview and
    /// unread count, most recently updated first.
    pub async fn conversations(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let connections: Vec<MutualConnection> = sqlx::query_as(
            r#"
            SELECT id, user_a, user_b, canonical_id, display_name, is_active, post_count,
                   created_at, updated_at
            FROM mutual_connections
            WHERE (user_a = $1 OR user_b = $1) AND is_active = TRUE
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(connections.len());
        for connection in connections {
            let last_message: Option<Message> = sqlx::query_as(
                r#"
                SELECT id, connection_id, sender_id, receiver_id, content, kind, is_read,
                       read_at, created_at
                FROM messages
                WHERE connection_id = $1
                ORDER BY created_at DESC
                LIMIT 1
                "#,
            )
            .bind(connection.id)
            .fetch_optional(&self.pool)
            .await?;

            let (unread_count,): (i64,) = sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM messages
                WHERE connection_id = $1 AND receiver_id = $2 AND is_read = FALSE
                "#,
            )
            .bind(connection.id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            summaries.push(ConversationSummary {
                connection,
                last_message,
                unread_count,
            });
        }

        Ok(summaries)
    }

    async fn load_connection(&self, connection_id: Uuid) -> AppResult<MutualConnection> {
        let connection: Option<MutualConnection> = sqlx::query_as(
            r#"
            SELECT id, user_a, user_b, canonical_id, display_name, is_active, post_count,
                   created_at, updated_at
            FROM mutual_connections
            WHERE id = $1
            "#,
        )
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await?;

        connection.ok_or(AppError::NotFound)
    }
}
