use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use connection_service::config::Config;
use connection_service::services::{
    ConnectionGraph, MessageRouter, NotificationEmitter, PgUserDirectory,
};
use connection_service::state::AppState;
use connection_service::websocket::PresenceRegistry;
use connection_service::{db, logging, routes};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    info!("starting connection-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        env = %config.app.env,
        port = config.app.port,
        "configuration loaded"
    );

    let pool = db::init_pool(&config.database)
        .await
        .context("Failed to connect to database")?;

    db::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("database pool created, migrations applied");

    let config = Arc::new(config);
    let presence = PresenceRegistry::new();
    let users = Arc::new(PgUserDirectory::new(pool.clone()));
    let notifications = NotificationEmitter::new(pool.clone());
    let connections = ConnectionGraph::new(pool.clone(), users, notifications.clone());
    let messages = MessageRouter::new(pool.clone(), presence.clone(), notifications.clone());

    let state = AppState {
        config: config.clone(),
        presence,
        connections,
        messages,
        notifications,
    };

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!(addr = %bind_addr, "http server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(state.config.clone()))
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("connection-service shutting down");
    Ok(())
}
