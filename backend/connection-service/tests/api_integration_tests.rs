//! Integration tests for the connection-service HTTP API
//!
//! Covers bearer auth enforcement, validation failures that
//! short-circuit before persistence, and the error response envelope.
//! All paths exercised here fail before any query runs, so the lazy
//! pool never has to connect.

use actix_web::{http::StatusCode, test, web, App};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

use connection_service::config::{AppConfig, AuthConfig, Config, DatabaseConfig};
use connection_service::middleware::Claims;
use connection_service::routes;
use connection_service::services::{
    ConnectionGraph, MessageRouter, NotificationEmitter, PgUserDirectory,
};
use connection_service::state::AppState;
use connection_service::websocket::PresenceRegistry;

const TEST_SECRET: &str = "test-secret";

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
        },
    })
}

/// State over a lazy pool: connections are only established on first use,
/// so paths that fail before persistence can run without a database.
fn test_state() -> AppState {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .expect("lazy pool");

    let config = test_config();
    let presence = PresenceRegistry::new();
    let users = Arc::new(PgUserDirectory::new(pool.clone()));
    let notifications = NotificationEmitter::new(pool.clone());
    let connections = ConnectionGraph::new(pool.clone(), users, notifications.clone());
    let messages = MessageRouter::new(pool, presence.clone(), notifications.clone());

    AppState {
        config,
        presence,
        connections,
        messages,
        notifications,
    }
}

fn bearer_for(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

macro_rules! test_app {
    () => {{
        let state = test_state();
        let config = state.config.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(web::Data::new(config))
                .configure(routes::configure),
        )
        .await
    }};
}

#[actix_web::test]
async fn health_endpoint_is_open() {
    let app = test_app!();

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn requests_without_bearer_are_unauthorized() {
    let app = test_app!();

    let req = test::TestRequest::get()
        .uri("/api/v1/connections/requests")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn garbage_bearer_is_unauthorized() {
    let app = test_app!();

    let req = test::TestRequest::get()
        .uri("/api/v1/connections/requests")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn self_targeted_toggle_is_invalid_argument() {
    let app = test_app!();
    let user_id = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/v1/connections/toggle")
        .insert_header(("Authorization", bearer_for(user_id)))
        .set_json(json!({ "target_user_id": user_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["status"], 400);
    assert!(body["message"].as_str().unwrap().contains("yourself"));
}

#[actix_web::test]
async fn websocket_upgrade_requires_a_valid_token() {
    let app = test_app!();

    let req = test::TestRequest::get()
        .uri("/ws?token=not-a-jwt")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn deactivation_requires_auth() {
    let app = test_app!();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/connections/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn notifications_require_auth() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications/read-all")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
