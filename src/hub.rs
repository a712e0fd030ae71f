//! Hub: room registry and event coordinator
//!
//! The hub owns the room registry and serializes every membership or
//! fan-out event through one event loop, so no two register, unregister
//! or broadcast events are ever interleaved mid-processing. Registry
//! lookups and the directory listing run concurrently under the shared
//! lock; create and delete take the exclusive lock.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use crate::error::HubError;
use crate::message;
use crate::room::Room;
use crate::session::Session;
use crate::types::SessionId;

/// Events consumed by the hub's event loop
#[derive(Debug)]
pub enum HubEvent {
    /// A session completed the handshake and joins its room
    Register { room: Arc<Room>, session: Session },
    /// A session's connection closed or errored
    Unregister { room: Arc<Room>, id: SessionId },
    /// A chat frame from one member, fanned out to the whole room
    Broadcast {
        room: Arc<Room>,
        sender: SessionId,
        body: String,
    },
}

/// One entry of the public room directory
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub name: String,
    pub has_pass: bool,
    pub user_count: usize,
}

/// The central coordinator
///
/// Holds the room registry. Mutating events go through [`Hub::run`];
/// lookups, password checks and the directory projection are direct
/// lock-guarded accessors.
#[derive(Debug, Default)]
pub struct Hub {
    /// All rooms, keyed by name
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl Hub {
    /// Create a hub with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room, hashing the password before it is stored.
    ///
    /// Fails with [`HubError::RoomExists`] if the name is taken and
    /// with [`HubError::PasswordHash`] if hashing fails; in both cases
    /// the registry is left untouched. An empty password means the
    /// room is open.
    pub async fn create_room(
        &self,
        name: &str,
        password: &str,
        private: bool,
    ) -> Result<Arc<Room>, HubError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(name) {
            return Err(HubError::RoomExists(name.to_string()));
        }

        let password_hash = if password.is_empty() {
            None
        } else {
            Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
        };

        let room = Arc::new(Room::new(name, password_hash, private));
        rooms.insert(name.to_string(), Arc::clone(&room));
        info!("room '{}' created (private: {})", name, private);
        Ok(room)
    }

    /// Look up a room by name
    pub async fn get_room(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(name).cloned()
    }

    /// Check a password against a room.
    ///
    /// True when the room has no password or when `password` matches
    /// the stored bcrypt hash (constant-time comparison inside bcrypt).
    /// False when the room does not exist.
    pub async fn verify_password(&self, name: &str, password: &str) -> bool {
        let rooms = self.rooms.read().await;
        match rooms.get(name) {
            Some(room) => match room.password_hash() {
                None => true,
                Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            },
            None => false,
        }
    }

    /// Delete a room iff it currently has no members.
    ///
    /// The registry exclusive lock is held across the emptiness check
    /// and the delete, so a join racing the last departure cannot
    /// observe a half-deleted room.
    pub async fn remove_if_empty(&self, name: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(name) {
            if room.is_empty().await {
                rooms.remove(name);
                debug!("room '{}' removed (empty)", name);
            }
        }
    }

    /// Directory projection: non-private rooms with live counts.
    ///
    /// Point-in-time snapshot under shared locks; does not wait for
    /// in-flight broadcasts.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let rooms = self.rooms.read().await;
        let mut listing = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            if room.is_private() {
                continue;
            }
            listing.push(RoomInfo {
                name: room.name().to_string(),
                has_pass: room.has_password(),
                user_count: room.member_count().await,
            });
        }
        listing
    }

    /// Run the hub event loop.
    ///
    /// Consumes events strictly in arrival order until all senders are
    /// dropped.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<HubEvent>) {
        info!("hub started");

        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }

        info!("hub shutting down");
    }

    /// Process a single event.
    ///
    /// Called only from the event loop (and from tests), one event at a
    /// time.
    pub async fn handle_event(&self, event: HubEvent) {
        match event {
            HubEvent::Register { room, session } => {
                let (username, count) = room.add(session).await;
                info!("'{}' joined room '{}' ({} members)", username, room.name(), count);
                let remaining = room.broadcast(&message::joined_line(&username, count)).await;
                if remaining == 0 {
                    self.remove_if_empty(room.name()).await;
                }
            }
            HubEvent::Unregister { room, id } => {
                // Idempotent: the member may already be gone after a
                // failed broadcast pruned it.
                let Some((session, count)) = room.remove(id).await else {
                    return;
                };
                info!(
                    "'{}' left room '{}' ({} members)",
                    session.username,
                    room.name(),
                    count
                );
                let remaining = room
                    .broadcast(&message::left_line(&session.username, count))
                    .await;
                if remaining == 0 {
                    self.remove_if_empty(room.name()).await;
                }
            }
            HubEvent::Broadcast { room, sender, body } => {
                // Frames from a sender that already left are dropped.
                let Some(username) = room.username_of(sender).await else {
                    debug!("broadcast from unknown sender {} dropped", sender);
                    return;
                };
                let remaining = room.broadcast(&message::chat_line(&username, &body)).await;
                if remaining == 0 {
                    self.remove_if_empty(room.name()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    fn session(name: &str) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (Session::new(SessionId::next(), name.to_string(), tx), rx)
    }

    #[tokio::test]
    async fn test_concurrent_create_yields_one_conflict() {
        let hub = Arc::new(Hub::new());

        let first = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move { hub.create_room("r1", "", false).await }
        });
        let second = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move { hub.create_room("r1", "", false).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(HubError::RoomExists(_)))));
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hub = Hub::new();
        hub.create_room("locked", "secret", false).await.unwrap();
        hub.create_room("open", "", false).await.unwrap();

        assert!(hub.verify_password("locked", "secret").await);
        assert!(!hub.verify_password("locked", "wrong").await);
        assert!(!hub.verify_password("locked", "").await);

        // A room without a password accepts anything.
        assert!(hub.verify_password("open", "anything").await);
        assert!(hub.verify_password("open", "").await);

        // Absent rooms never verify.
        assert!(!hub.verify_password("missing", "secret").await);
    }

    #[tokio::test]
    async fn test_create_never_stores_plaintext() {
        let hub = Hub::new();
        let room = hub.create_room("locked", "secret", false).await.unwrap();

        assert!(room.has_password());
        assert_ne!(room.password_hash().unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_room_removed_after_all_leave() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();

        let mut ids = Vec::new();
        let mut rxs = Vec::new();
        for i in 0..4 {
            let (s, rx) = session(&format!("user{i}"));
            ids.push(s.id);
            rxs.push(rx);
            hub.handle_event(HubEvent::Register {
                room: Arc::clone(&room),
                session: s,
            })
            .await;
        }
        assert_eq!(room.member_count().await, 4);

        for id in ids {
            hub.handle_event(HubEvent::Unregister {
                room: Arc::clone(&room),
                id,
            })
            .await;
        }

        assert!(hub.get_room("r").await.is_none());
    }

    #[tokio::test]
    async fn test_join_leave_and_chat_notifications() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();

        let (alice, mut rx_alice) = session("Alice");
        let alice_id = alice.id;
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: alice,
        })
        .await;
        assert_eq!(
            rx_alice.recv().await.unwrap(),
            "SYS: Alice joined. Users in room: 1"
        );

        let (bob, mut rx_bob) = session("Bob");
        let bob_id = bob.id;
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: bob,
        })
        .await;
        assert_eq!(
            rx_alice.recv().await.unwrap(),
            "SYS: Bob joined. Users in room: 2"
        );
        assert_eq!(
            rx_bob.recv().await.unwrap(),
            "SYS: Bob joined. Users in room: 2"
        );

        hub.handle_event(HubEvent::Broadcast {
            room: Arc::clone(&room),
            sender: alice_id,
            body: "hi".to_string(),
        })
        .await;
        assert_eq!(rx_alice.recv().await.unwrap(), "[Alice] hi");
        assert_eq!(rx_bob.recv().await.unwrap(), "[Alice] hi");

        hub.handle_event(HubEvent::Unregister {
            room: Arc::clone(&room),
            id: bob_id,
        })
        .await;
        assert_eq!(
            rx_alice.recv().await.unwrap(),
            "SYS: Bob left. Users in room: 1"
        );
    }

    #[tokio::test]
    async fn test_chat_uses_assigned_username() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();

        let (first, _rx_first) = session("Bob");
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: first,
        })
        .await;

        let (second, mut rx_second) = session("Bob");
        let second_id = second.id;
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: second,
        })
        .await;
        assert_eq!(
            rx_second.recv().await.unwrap(),
            "SYS: Bob1 joined. Users in room: 2"
        );

        hub.handle_event(HubEvent::Broadcast {
            room: Arc::clone(&room),
            sender: second_id,
            body: "hello".to_string(),
        })
        .await;
        assert_eq!(rx_second.recv().await.unwrap(), "[Bob1] hello");
    }

    #[tokio::test]
    async fn test_broadcast_from_unknown_sender_is_dropped() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();

        let (alice, mut rx_alice) = session("Alice");
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: alice,
        })
        .await;
        let _ = rx_alice.recv().await; // joined notification

        hub.handle_event(HubEvent::Broadcast {
            room: Arc::clone(&room),
            sender: SessionId::next(),
            body: "ghost".to_string(),
        })
        .await;

        assert!(matches!(rx_alice.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_broadcast_emptying_room_removes_it() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();

        let (alice, mut rx_alice) = session("Alice");
        let alice_id = alice.id;
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: alice,
        })
        .await;
        let _ = rx_alice.recv().await; // joined notification

        // The last member's connection breaks; the next fan-out prunes
        // it and the emptied room leaves the registry in the same pass.
        drop(rx_alice);
        hub.handle_event(HubEvent::Broadcast {
            room: Arc::clone(&room),
            sender: alice_id,
            body: "hi".to_string(),
        })
        .await;

        assert_eq!(room.member_count().await, 0);
        assert!(hub.get_room("r").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_if_empty_keeps_occupied_room() {
        let hub = Hub::new();
        let room = hub.create_room("r", "", false).await.unwrap();
        let (alice, _rx) = session("Alice");
        hub.handle_event(HubEvent::Register {
            room: Arc::clone(&room),
            session: alice,
        })
        .await;

        hub.remove_if_empty("r").await;

        assert!(hub.get_room("r").await.is_some());
    }

    #[tokio::test]
    async fn test_directory_hides_private_rooms() {
        let hub = Hub::new();
        hub.create_room("lobby", "", false).await.unwrap();
        hub.create_room("hidden", "", true).await.unwrap();
        hub.create_room("locked", "pw", false).await.unwrap();

        let listing = hub.list_rooms().await;
        let names: Vec<&str> = listing.iter().map(|r| r.name.as_str()).collect();

        assert!(names.contains(&"lobby"));
        assert!(names.contains(&"locked"));
        assert!(!names.contains(&"hidden"));

        let locked = listing.iter().find(|r| r.name == "locked").unwrap();
        assert!(locked.has_pass);
        assert_eq!(locked.user_count, 0);

        // Private rooms stay joinable by name.
        assert!(hub.get_room("hidden").await.is_some());
    }

    #[test]
    fn test_room_info_wire_format() {
        let info = RoomInfo {
            name: "r".to_string(),
            has_pass: true,
            user_count: 3,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"name\":\"r\""));
        assert!(json.contains("\"hasPass\":true"));
        assert!(json.contains("\"userCount\":3"));
    }
}
