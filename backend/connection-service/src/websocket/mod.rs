use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

use crate::models::connection::canonical_id;

pub mod message_types;

use message_types::WsOutboundEvent;

/// Instruction pushed into a live WebSocket session actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Write a payload to the socket.
    Deliver(String),
    /// Close the socket; the session was displaced by a newer one.
    Close,
}

/// Channel into a live WebSocket session actor.
pub type SessionSender = UnboundedSender<SessionCommand>;

/// Volatile per-session presence state. Created on authenticated connect,
/// destroyed on disconnect; never persisted.
struct PresenceEntry {
    session_id: Uuid,
    sender: SessionSender,
    joined_rooms: HashSet<String>,
}

#[derive(Default)]
struct Inner {
    /// user_id -> live session (single session per user; register overwrites)
    by_user: HashMap<Uuid, PresenceEntry>,
    /// session_id -> owning user, for disconnect cleanup
    by_session: HashMap<Uuid, Uuid>,
    /// canonical room id -> session_id -> sender
    rooms: HashMap<String, HashMap<Uuid, SessionSender>>,
}

impl Inner {
    fn remove_session_from_rooms(&mut self, session_id: Uuid, rooms: &HashSet<String>) {
        for room in rooms {
            let now_empty = match self.rooms.get_mut(room) {
                Some(members) => {
                    members.remove(&session_id);
                    members.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.rooms.remove(room);
            }
        }
    }
}

/// Tracks which users hold a live real-time session and which conversation
/// rooms each session has joined. Purely process-local; concurrent access
/// is synchronized behind an RwLock.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a user to a live session, displacing any previous one
    /// (single-session-per-user model). Returns the displaced session's
    /// sender so the caller can close the old socket. Broadcasts
    /// `user-online` to all other live sessions.
    pub async fn register(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: SessionSender,
    ) -> Option<SessionSender> {
        let mut guard = self.inner.write().await;

        let displaced = guard.by_user.remove(&user_id).map(|old| {
            guard.by_session.remove(&old.session_id);
            let rooms = old.joined_rooms.clone();
            guard.remove_session_from_rooms(old.session_id, &rooms);
            old.sender
        });

        guard.by_user.insert(
            user_id,
            PresenceEntry {
                session_id,
                sender,
                joined_rooms: HashSet::new(),
            },
        );
        guard.by_session.insert(session_id, user_id);

        let payload = WsOutboundEvent::UserOnline { user_id }.to_payload();
        Self::fan_out(&mut guard, &payload, Some(session_id));

        tracing::debug!(%user_id, %session_id, "presence registered");
        displaced
    }

    /// Remove the mapping owned by `session_id` and broadcast
    /// `user-offline`. A stale disconnect (the user already re-registered
    /// with a newer session) is a no-op.
    pub async fn deregister(&self, session_id: Uuid) -> Option<Uuid> {
        let mut guard = self.inner.write().await;

        let user_id = guard.by_session.get(&session_id).copied()?;
        match guard.by_user.get(&user_id) {
            Some(entry) if entry.session_id == session_id => {}
            _ => {
                guard.by_session.remove(&session_id);
                return None;
            }
        }

        let entry = guard.by_user.remove(&user_id)?;
        guard.by_session.remove(&session_id);
        let rooms = entry.joined_rooms;
        guard.remove_session_from_rooms(session_id, &rooms);

        let payload = WsOutboundEvent::UserOffline { user_id }.to_payload();
        Self::fan_out(&mut guard, &payload, None);

        tracing::debug!(%user_id, %session_id, "presence deregistered");
        Some(user_id)
    }

    /// Join the conversation room shared with `other_user_id`. The room is
    /// keyed by the canonical id of the pair, so both members land in the
    /// same room regardless of who initiates.
    pub async fn join_room(&self, session_id: Uuid, other_user_id: Uuid) -> Option<String> {
        let mut guard = self.inner.write().await;

        let user_id = guard.by_session.get(&session_id).copied()?;
        let room = canonical_id(user_id, other_user_id);

        let entry = guard.by_user.get_mut(&user_id)?;
        if entry.session_id != session_id {
            return None;
        }
        entry.joined_rooms.insert(room.clone());
        let sender = entry.sender.clone();

        guard
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(session_id, sender);

        Some(room)
    }

    pub async fn leave_room(&self, session_id: Uuid, other_user_id: Uuid) -> Option<String> {
        let mut guard = self.inner.write().await;

        let user_id = guard.by_session.get(&session_id).copied()?;
        let room = canonical_id(user_id, other_user_id);

        if let Some(entry) = guard.by_user.get_mut(&user_id) {
            entry.joined_rooms.remove(&room);
        }
        let now_empty = match guard.rooms.get_mut(&room) {
            Some(members) => {
                members.remove(&session_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            guard.rooms.remove(&room);
        }

        Some(room)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    /// Push a payload to the user's live session, if any. A dead sender is
    /// pruned. Returns whether the payload was handed to a live channel.
    pub async fn send_to_user(&self, user_id: Uuid, payload: &str) -> bool {
        let mut guard = self.inner.write().await;

        let delivered = match guard.by_user.get(&user_id) {
            Some(entry) => entry
                .sender
                .send(SessionCommand::Deliver(payload.to_string()))
                .is_ok(),
            None => return false,
        };

        if !delivered {
            if let Some(entry) = guard.by_user.remove(&user_id) {
                guard.by_session.remove(&entry.session_id);
                let rooms = entry.joined_rooms;
                guard.remove_session_from_rooms(entry.session_id, &rooms);
            }
            tracing::debug!(%user_id, "pruned dead presence entry");
        }
        delivered
    }

    /// Fan a payload out to every session in a room, optionally excluding
    /// one (the originator of a typing event). Dead senders are pruned.
    pub async fn broadcast_room(&self, room: &str, payload: &str, exclude: Option<Uuid>) {
        let mut guard = self.inner.write().await;
        let now_empty = match guard.rooms.get_mut(room) {
            Some(members) => {
                members.retain(|session_id, sender| {
                    if Some(*session_id) == exclude {
                        return true;
                    }
                    sender
                        .send(SessionCommand::Deliver(payload.to_string()))
                        .is_ok()
                });
                members.is_empty()
            }
            None => return,
        };
        if now_empty {
            guard.rooms.remove(room);
        }
    }

    pub async fn online_count(&self) -> usize {
        self.inner.read().await.by_user.len()
    }

    fn fan_out(guard: &mut Inner, payload: &str, exclude_session: Option<Uuid>) {
        for entry in guard.by_user.values() {
            if Some(entry.session_id) == exclude_session {
                continue;
            }
            // Dead senders are cleaned up by their own session teardown
            let _ = entry.sender.send(SessionCommand::Deliver(payload.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn session() -> (Uuid, SessionSender, UnboundedReceiver<SessionCommand>) {
        let (tx, rx) = unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    fn delivered(cmd: SessionCommand) -> String {
        match cmd {
            SessionCommand::Deliver(payload) => payload,
            SessionCommand::Close => panic!("expected a delivery, got a close"),
        }
    }

    #[tokio::test]
    async fn register_makes_user_online_and_deregister_removes() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (sid, tx, _rx) = session();

        assert!(!registry.is_online(user).await);
        registry.register(user, sid, tx).await;
        assert!(registry.is_online(user).await);

        assert_eq!(registry.deregister(sid).await, Some(user));
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn register_overwrites_previous_session_for_user() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (old_sid, old_tx, _old_rx) = session();
        let (new_sid, new_tx, _new_rx) = session();

        assert!(registry.register(user, old_sid, old_tx).await.is_none());
        let displaced = registry.register(user, new_sid, new_tx).await;
        assert!(displaced.is_some());

        // Stale disconnect from the displaced session must not take the
        // newer session offline.
        assert_eq!(registry.deregister(old_sid).await, None);
        assert!(registry.is_online(user).await);

        assert_eq!(registry.deregister(new_sid).await, Some(user));
    }

    #[tokio::test]
    async fn displaced_session_can_be_told_to_close() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (old_sid, old_tx, mut old_rx) = session();
        let (new_sid, new_tx, _new_rx) = session();

        registry.register(user, old_sid, old_tx).await;
        let displaced = registry.register(user, new_sid, new_tx).await.unwrap();

        // Drain the user-online broadcast the old session saw
        while let Ok(cmd) = old_rx.try_recv() {
            assert_ne!(cmd, SessionCommand::Close);
        }

        displaced.send(SessionCommand::Close).unwrap();
        assert_eq!(old_rx.recv().await.unwrap(), SessionCommand::Close);
    }

    #[tokio::test]
    async fn online_broadcast_reaches_other_sessions() {
        let registry = PresenceRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (alice_sid, alice_tx, mut alice_rx) = session();
        let (bob_sid, bob_tx, _bob_rx) = session();

        registry.register(alice, alice_sid, alice_tx).await;
        registry.register(bob, bob_sid, bob_tx).await;

        let payload = delivered(alice_rx.recv().await.unwrap());
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "user-online");
        assert_eq!(value["user_id"], bob.to_string());
    }

    #[tokio::test]
    async fn room_broadcast_covers_both_members_and_respects_exclude() {
        let registry = PresenceRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (alice_sid, alice_tx, mut alice_rx) = session();
        let (bob_sid, bob_tx, mut bob_rx) = session();

        registry.register(alice, alice_sid, alice_tx).await;
        registry.register(bob, bob_sid, bob_tx).await;
        // drain presence events
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        let room_a = registry.join_room(alice_sid, bob).await.unwrap();
        let room_b = registry.join_room(bob_sid, alice).await.unwrap();
        assert_eq!(room_a, room_b);

        registry.broadcast_room(&room_a, "hello", Some(alice_sid)).await;
        assert_eq!(delivered(bob_rx.recv().await.unwrap()), "hello");
        assert!(alice_rx.try_recv().is_err());

        registry.leave_room(bob_sid, alice).await;
        registry.broadcast_room(&room_a, "again", None).await;
        assert_eq!(delivered(alice_rx.recv().await.unwrap()), "again");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_user_prunes_dead_sessions() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (sid, tx, rx) = session();

        registry.register(user, sid, tx).await;
        drop(rx);

        assert!(!registry.send_to_user(user, "hi").await);
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn send_to_offline_user_is_a_noop() {
        let registry = PresenceRegistry::new();
        assert!(!registry.send_to_user(Uuid::new_v4(), "hi").await);
    }
}
