use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Narrow read interface to the user directory. The user entity is owned by
/// the identity collaborator; this service only needs usernames for
/// connection display names.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn username(&self, user_id: Uuid) -> AppResult<String>;
}

/// Reads usernames from the shared `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn username(&self, user_id: Uuid) -> AppResult<String> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT username FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(username,)| username).ok_or(AppError::NotFound)
    }
}
