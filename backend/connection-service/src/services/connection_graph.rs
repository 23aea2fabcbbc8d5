use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::connection::{canonical_id, display_name, sorted_pair};
use crate::models::{ConnectionRequest, MutualConnection, NotificationKind, RequestStatus};
use crate::services::notification_emitter::NotificationEmitter;
use crate::services::user_directory::UserDirectory;

/// Result of a follow toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ToggleOutcome {
    Unfollowed,
    Requested { request: ConnectionRequest },
}

/// Follow relationship between two users, both directions.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MutualStatus {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub is_connected: bool,
}

/// Response payload for an accepted request.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedConnection {
    pub mutual_connection_id: Uuid,
    pub canonical_id: String,
    pub display_name: String,
}

/// Owns follow-request state and canonical mutual-connection
/// materialization. The request row for an ordered pair and the connection
/// row for a canonical id are the two contention points; both are resolved
/// in single conditional statements rather than read-modify-write.
#[derive(Clone)]
pub struct ConnectionGraph {
    pool: PgPool,
    users: Arc<dyn UserDirectory>,
    notifier: NotificationEmitter,
}

impl ConnectionGraph {
    pub fn new(pool: PgPool, users: Arc<dyn UserDirectory>, notifier: NotificationEmitter) -> Self {
        Self {
            pool,
            users,
            notifier,
        }
    }

    /// Follow toggle: unfollow if the edge exists, otherwise create a fresh
    /// pending request. A pending request for the same ordered pair is a
    /// conflict; a settled one is replaced (re-request after accept/reject).
    pub async fn toggle(&self, requester_id: Uuid, target_id: Uuid) -> AppResult<ToggleOutcome> {
        if requester_id == target_id {
            return Err(AppError::InvalidArgument(
                "cannot follow yourself".to_string(),
            ));
        }

        let following: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(requester_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        if following.is_some() {
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(requester_id)
                .bind(target_id)
                .execute(&self.pool)
                .await?;

            // Tombstone any request between the pair, either direction
            sqlx::query(
                r#"
                DELETE FROM connection_requests
                WHERE (requester_id = $1 AND recipient_id = $2)
                   OR (requester_id = $2 AND recipient_id = $1)
                "#,
            )
            .bind(requester_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

            tracing::info!(%requester_id, %target_id, "unfollowed");
            return Ok(ToggleOutcome::Unfollowed);
        }

        let existing: Option<ConnectionRequest> = sqlx::query_as(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at, updated_at
            FROM connection_requests
            WHERE requester_id = $1 AND recipient_id = $2
            "#,
        )
        .bind(requester_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(request) = existing {
            if request.status == RequestStatus::Pending {
                return Err(AppError::Conflict("request already pending".to_string()));
            }
            // Settled request: allow a re-request by replacing the row
            sqlx::query("DELETE FROM connection_requests WHERE id = $1")
                .bind(request.id)
                .execute(&self.pool)
                .await?;
        }

        let request: ConnectionRequest = sqlx::query_as(
            r#"
            INSERT INTO connection_requests (id, requester_id, recipient_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', NOW(), NOW())
            RETURNING id, requester_id, recipient_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("request already pending".to_string())
            }
            _ => e.into(),
        })?;

        self.notifier
            .emit_or_log(
                target_id,
                requester_id,
                NotificationKind::ConnectionRequest,
                "sent you a connection request",
                Some(request.id),
                Some("connection_request"),
            )
            .await;

        tracing::info!(%requester_id, %target_id, request_id = %request.id, "connection requested");
        Ok(ToggleOutcome::Requested { request })
    }

    /// Accept a pending request: flip status with a conditional update,
    /// wire both follow edges, then materialize (or reactivate) the
    /// connection keyed by canonical id.
    pub async fn accept(
        &self,
        request_id: Uuid,
        acting_user_id: Uuid,
    ) -> AppResult<AcceptedConnection> {
        let request = self.load_request(request_id).await?;
        if request.recipient_id != acting_user_id {
            return Err(AppError::Forbidden);
        }

        self.transition(request_id, RequestStatus::Accepted).await?;

        // Both directions, idempotent: accepting twice-wired pairs is a no-op
        for (follower, followee) in [
            (request.requester_id, request.recipient_id),
            (request.recipient_id, request.requester_id),
        ] {
            sqlx::query(
                r#"
                INSERT INTO follows (follower_id, followee_id, created_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (follower_id, followee_id) DO NOTHING
                "#,
            )
            .bind(follower)
            .bind(followee)
            .execute(&self.pool)
            .await?;
        }

        let connection = self
            .materialize_connection(request.requester_id, request.recipient_id)
            .await?;

        for (target, from) in [
            (request.requester_id, request.recipient_id),
            (request.recipient_id, request.requester_id),
        ] {
            self.notifier
                .emit_or_log(
                    target,
                    from,
                    NotificationKind::ConnectionAccepted,
                    "you are now connected",
                    Some(connection.id),
                    Some("mutual_connection"),
                )
                .await;
        }

        tracing::info!(
            request_id = %request_id,
            connection_id = %connection.id,
            canonical_id = %connection.canonical_id,
            "connection request accepted"
        );

        Ok(AcceptedConnection {
            mutual_connection_id: connection.id,
            canonical_id: connection.canonical_id,
            display_name: connection.display_name,
        })
    }

    /// Reject a pending request. No connection side effect.
    pub async fn reject(&self, request_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
        let request = self.load_request(request_id).await?;
        if request.recipient_id != acting_user_id {
            return Err(AppError::Forbidden);
        }

        self.transition(request_id, RequestStatus::Rejected).await?;

        self.notifier
            .emit_or_log(
                request.requester_id,
                request.recipient_id,
                NotificationKind::ConnectionRejected,
                "declined your connection request",
                Some(request.id),
                Some("connection_request"),
            )
            .await;

        tracing::info!(request_id = %request_id, "connection request rejected");
        Ok(())
    }

    /// Pure read: does A follow B, does B follow A, and the conjunction.
    pub async fn check_mutual(&self, user_a: Uuid, user_b: Uuid) -> AppResult<MutualStatus> {
        let (is_following, is_followed_by): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2),
                EXISTS(SELECT 1 FROM follows WHERE follower_id = $2 AND followee_id = $1)
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.pool)
        .await?;

        Ok(MutualStatus {
            is_following,
            is_followed_by,
            is_connected: is_following && is_followed_by,
        })
    }

    /// Pending requests addressed to and sent by the user.
    pub async fn pending_requests(
        &self,
        user_id: Uuid,
    ) -> AppResult<(Vec<ConnectionRequest>, Vec<ConnectionRequest>)> {
        let incoming: Vec<ConnectionRequest> = sqlx::query_as(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at, updated_at
            FROM connection_requests
            WHERE recipient_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let outgoing: Vec<ConnectionRequest> = sqlx::query_as(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at, updated_at
            FROM connection_requests
            WHERE requester_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((incoming, outgoing))
    }

    /// Deliberate, separate deactivation path. Unfollowing never touches
    /// `is_active`; connections persist once formed until this is called.
    pub async fn deactivate(&self, connection_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
        let connection: MutualConnection = sqlx::query_as(
            r#"
            SELECT id, user_a, user_b, canonical_id, display_name, is_active, post_count,
                   created_at, updated_at
            FROM mutual_connections
            WHERE id = $1
            "#,
        )
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        if !connection.is_member(acting_user_id) {
            return Err(AppError::Forbidden);
        }

        sqlx::query(
            "UPDATE mutual_connections SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(connection_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_request(&self, request_id: Uuid) -> AppResult<ConnectionRequest> {
        let request: Option<ConnectionRequest> = sqlx::query_as(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at, updated_at
            FROM connection_requests
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        request.ok_or(AppError::NotFound)
    }

    /// Compare-and-swap on status. Two concurrent accepts both pass the
    /// pending read; only the one whose UPDATE matches a pending row runs
    /// the side effects. The loser gets InvalidState.
    async fn transition(&self, request_id: Uuid, to: RequestStatus) -> AppResult<()> {
        let affected = sqlx::query(
            r#"
            UPDATE connection_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(request_id)
        .bind(to.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::InvalidState("request is not pending".to_string()));
        }
        Ok(())
    }

    /// Create the connection for the pair, or reactivate the existing row.
    /// The canonical-id unique constraint makes this idempotent across
    /// request directions.
    async fn materialize_connection(
        &self,
        user_x: Uuid,
        user_y: Uuid,
    ) -> AppResult<MutualConnection> {
        let (user_a, user_b) = sorted_pair(user_x, user_y);
        let canonical = canonical_id(user_a, user_b);

        let name_a = self.users.username(user_a).await?;
        let name_b = self.users.username(user_b).await?;
        let display = display_name(&name_a, &name_b);

        let connection: MutualConnection = sqlx::query_as(
            r#"
            INSERT INTO mutual_connections
                (id, user_a, user_b, canonical_id, display_name, is_active, post_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, 0, NOW(), NOW())
            ON CONFLICT (canonical_id)
            DO UPDATE SET is_active = TRUE, display_name = EXCLUDED.display_name, updated_at = NOW()
            RETURNING id, user_a, user_b, canonical_id, display_name, is_active, post_count,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_a)
        .bind(user_b)
        .bind(&canonical)
        .bind(&display)
        .fetch_one(&self.pool)
        .await?;

        Ok(connection)
    }
}
