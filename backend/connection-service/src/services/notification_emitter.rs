use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationKind};

/// Best-effort creation of user-facing notification records, plus the
/// per-user read side. Emission failures never propagate to the state
/// transition that triggered them; callers go through [`emit_or_log`].
///
/// [`emit_or_log`]: NotificationEmitter::emit_or_log
#[derive(Clone)]
pub struct NotificationEmitter {
    pool: PgPool,
}

impl NotificationEmitter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a notification record. No-op (returns `None`, no error) when
    /// the target is the originator.
    pub async fn emit(
        &self,
        target_user_id: Uuid,
        from_user_id: Uuid,
        kind: NotificationKind,
        message: &str,
        related_id: Option<Uuid>,
        related_kind: Option<&str>,
    ) -> AppResult<Option<Notification>> {
        if target_user_id == from_user_id {
            return Ok(None);
        }

        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications
                (id, target_user_id, from_user_id, kind, message, related_id, related_kind, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW())
            RETURNING id, target_user_id, from_user_id, kind, message, related_id, related_kind,
                      is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(target_user_id)
        .bind(from_user_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(related_id)
        .bind(related_kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(notification))
    }

    /// Fire-and-forget wrapper: failures are logged and swallowed so that
    /// emission is never on the critical path of the caller's transition.
    pub async fn emit_or_log(
        &self,
        target_user_id: Uuid,
        from_user_id: Uuid,
        kind: NotificationKind,
        message: &str,
        related_id: Option<Uuid>,
        related_kind: Option<&str>,
    ) {
        if let Err(e) = self
            .emit(target_user_id, from_user_id, kind, message, related_id, related_kind)
            .await
        {
            tracing::warn!(
                error = %e,
                %target_user_id,
                kind = kind.as_str(),
                "failed to emit notification"
            );
        }
    }

    /// Newest-first page of the user's notifications plus their unread count.
    pub async fn list(
        &self,
        user_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let (page_size, offset) = super::page_offset(page, page_size);

        let notifications: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT id, target_user_id, from_user_id, kind, message, related_id, related_kind,
                   is_read, created_at
            FROM notifications
            WHERE target_user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (unread,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE target_user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((notifications, unread))
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<()> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND target_user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE target_user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<()> {
        let affected =
            sqlx::query("DELETE FROM notifications WHERE id = $1 AND target_user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
