use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthedUser;
use crate::models::MessageKind;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

/// POST /api/v1/connections/{connection_id}/messages
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> AppResult<HttpResponse> {
    let message = state
        .messages
        .send(user.id, path.into_inner(), &body.content, body.kind)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

/// GET /api/v1/connections/{connection_id}/messages?page=&limit=
///
/// Oldest-first page; marks the caller's unread messages read as a side
/// effect.
pub async fn message_history(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let messages = state
        .messages
        .history(path.into_inner(), user.id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// GET /api/v1/connections/{connection_id}/messages/unread-count
pub async fn unread_count(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let count = state
        .messages
        .unread_count(path.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "count": count })))
}

/// POST /api/v1/connections/{connection_id}/messages/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let connection_id = path.into_inner();
    // Guard membership the same way history does
    state.messages.unread_count(connection_id, user.id).await?;
    let updated = state.messages.mark_read(connection_id, user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// GET /api/v1/connections
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthedUser,
) -> AppResult<HttpResponse> {
    let conversations = state.messages.conversations(user.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}
