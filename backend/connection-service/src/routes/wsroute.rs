use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::unbounded_channel;
use uuid::Uuid;

use crate::middleware::auth::verify_token;
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::{PresenceRegistry, SessionCommand};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// Payload pushed into the session from the presence registry
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct PushMessage(String);

/// The session was displaced by a newer one; close the socket.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct CloseSession;

/// One live real-time session for an authenticated user. Registers with
/// the PresenceRegistry on start (broadcasting user-online) and
/// deregisters on stop (user-offline).
struct WsSession {
    user_id: Uuid,
    session_id: Uuid,
    presence: PresenceRegistry,
    hb: Instant,
}

impl WsSession {
    fn new(user_id: Uuid, presence: PresenceRegistry) -> Self {
        Self {
            user_id,
            session_id: Uuid::new_v4(),
            presence,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_event(&self, evt: WsInboundEvent) {
        let presence = self.presence.clone();
        let user_id = self.user_id;
        let session_id = self.session_id;

        actix::spawn(async move {
            match evt {
                WsInboundEvent::Typing { other_user_id } => {
                    let room = crate::models::connection::canonical_id(user_id, other_user_id);
                    let payload = WsOutboundEvent::Typing {
                        from_user_id: user_id,
                    }
                    .to_payload();
                    presence
                        .broadcast_room(&room, &payload, Some(session_id))
                        .await;
                }
                WsInboundEvent::StopTyping { other_user_id } => {
                    let room = crate::models::connection::canonical_id(user_id, other_user_id);
                    let payload = WsOutboundEvent::StopTyping {
                        from_user_id: user_id,
                    }
                    .to_payload();
                    presence
                        .broadcast_room(&room, &payload, Some(session_id))
                        .await;
                }
                WsInboundEvent::JoinConversation { other_user_id } => {
                    presence.join_room(session_id, other_user_id).await;
                }
                WsInboundEvent::LeaveConversation { other_user_id } => {
                    presence.leave_room(session_id, other_user_id).await;
                }
            }
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, session_id = %self.session_id, "websocket session started");

        self.hb(ctx);

        // Bridge the registry's channel into this actor
        let (tx, mut rx) = unbounded_channel::<SessionCommand>();
        let addr = ctx.address();
        actix::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    SessionCommand::Deliver(payload) => addr.do_send(PushMessage(payload)),
                    SessionCommand::Close => {
                        addr.do_send(CloseSession);
                        break;
                    }
                }
            }
        });

        let presence = self.presence.clone();
        let user_id = self.user_id;
        let session_id = self.session_id;
        actix::spawn(async move {
            // The displaced sender belongs to an older session of the same
            // user; tell that session's actor to close its socket.
            if let Some(displaced) = presence.register(user_id, session_id, tx).await {
                let _ = displaced.send(SessionCommand::Close);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, session_id = %self.session_id, "websocket session stopped");

        let presence = self.presence.clone();
        let session_id = self.session_id;
        actix::spawn(async move {
            presence.deregister(session_id).await;
        });
    }
}

impl Handler<PushMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: PushMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<CloseSession> for WsSession {
    type Result = ();

    fn handle(&mut self, _msg: CloseSession, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, session_id = %self.session_id, "session displaced by a newer connection");
        ctx.close(Some(ws::CloseCode::Policy.into()));
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsInboundEvent>(&text) {
                Ok(evt) => self.handle_event(evt),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse ws message");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary websocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(?reason, "websocket close received");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// GET /ws?token=
///
/// Authenticated at handshake with a bearer credential passed as a query
/// parameter (browsers cannot set headers on WebSocket upgrades).
#[get("/ws")]
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = verify_token(&query.token, &state.config.auth.jwt_secret)?;
    ws::start(WsSession::new(user_id, state.presence.clone()), &req, stream)
}
