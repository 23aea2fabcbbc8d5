use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthedUser;
use crate::models::ConnectionRequest;
use crate::services::ToggleOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub target_user_id: Uuid,
}

/// POST /api/v1/connections/toggle
///
/// 200 when the follow was removed, 201 when a new request was created,
/// 409 when one is already pending.
pub async fn toggle(
    state: web::Data<AppState>,
    user: AuthedUser,
    body: web::Json<ToggleRequest>,
) -> AppResult<HttpResponse> {
    let outcome = state.connections.toggle(user.id, body.target_user_id).await?;

    Ok(match &outcome {
        ToggleOutcome::Unfollowed => HttpResponse::Ok().json(outcome),
        ToggleOutcome::Requested { .. } => HttpResponse::Created().json(outcome),
    })
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub incoming: Vec<ConnectionRequest>,
    pub outgoing: Vec<ConnectionRequest>,
}

/// GET /api/v1/connections/requests
pub async fn list_requests(
    state: web::Data<AppState>,
    user: AuthedUser,
) -> AppResult<HttpResponse> {
    let (incoming, outgoing) = state.connections.pending_requests(user.id).await?;
    Ok(HttpResponse::Ok().json(RequestsResponse { incoming, outgoing }))
}

/// POST /api/v1/connections/requests/{id}/accept
pub async fn accept_request(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let accepted = state.connections.accept(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(accepted))
}

/// POST /api/v1/connections/requests/{id}/reject
pub async fn reject_request(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.connections.reject(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "rejected" })))
}

/// DELETE /api/v1/connections/{connection_id}
///
/// Deactivates the connection; the row (and its message history) stays.
/// Re-accepting a later request reactivates it.
pub async fn deactivate_connection(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.connections.deactivate(path.into_inner(), user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/connections/{other_user_id}/status
pub async fn connection_status(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let status = state
        .connections
        .check_mutual(user.id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(status))
}
