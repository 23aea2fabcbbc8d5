use std::sync::Arc;

use crate::config::Config;
use crate::services::{ConnectionGraph, MessageRouter, NotificationEmitter};
use crate::websocket::PresenceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub presence: PresenceRegistry,
    pub connections: ConnectionGraph,
    pub messages: MessageRouter,
    pub notifications: NotificationEmitter,
}
