use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthedUser;
use crate::models::Notification;
use crate::routes::messages::PageParams;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// GET /api/v1/notifications?page=&limit=
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthedUser,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let (notifications, unread_count) = state
        .notifications
        .list(user.id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

/// POST /api/v1/notifications/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.notifications.mark_read(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user: AuthedUser,
) -> AppResult<HttpResponse> {
    let updated = state.notifications.mark_all_read(user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.notifications.delete(path.into_inner(), user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}
