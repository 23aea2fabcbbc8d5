use actix_web::web;

pub mod connections;
pub mod messages;
pub mod notifications;
pub mod wsroute;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/connections")
                    .route("", web::get().to(messages::list_conversations))
                    .route("/toggle", web::post().to(connections::toggle))
                    .route("/requests", web::get().to(connections::list_requests))
                    .route(
                        "/requests/{id}/accept",
                        web::post().to(connections::accept_request),
                    )
                    .route(
                        "/requests/{id}/reject",
                        web::post().to(connections::reject_request),
                    )
                    .route(
                        "/{other_user_id}/status",
                        web::get().to(connections::connection_status),
                    )
                    .route(
                        "/{connection_id}",
                        web::delete().to(connections::deactivate_connection),
                    )
                    .route(
                        "/{connection_id}/messages",
                        web::post().to(messages::send_message),
                    )
                    .route(
                        "/{connection_id}/messages",
                        web::get().to(messages::message_history),
                    )
                    .route(
                        "/{connection_id}/messages/unread-count",
                        web::get().to(messages::unread_count),
                    )
                    .route(
                        "/{connection_id}/messages/read",
                        web::post().to(messages::mark_read),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .route("", web::get().to(notifications::list_notifications))
                    .route("/read-all", web::post().to(notifications::mark_all_read))
                    .route("/{id}/read", web::post().to(notifications::mark_read))
                    .route("/{id}", web::delete().to(notifications::delete_notification)),
            ),
    )
    .service(wsroute::ws_connect)
    .route("/health", web::get().to(|| async { "OK" }));
}
