//! Room struct definition
//!
//! A named broadcast group with an optional password hash and a privacy
//! flag. Owns the membership map: exclusive lock for add/remove, shared
//! lock for broadcast, listing and password checks.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::debug;

use crate::session::Session;
use crate::types::SessionId;

/// How many numeric suffixes to probe before the timestamp fallback
const SUFFIX_PROBE_LIMIT: u32 = 100;

/// A chat room
///
/// `name` and `private` are fixed at creation. `password_hash` stores a
/// bcrypt hash (never the plaintext); `None` means the room is open.
#[derive(Debug)]
pub struct Room {
    name: String,
    password_hash: Option<String>,
    private: bool,
    /// Connected members, keyed by session id
    members: RwLock<HashMap<SessionId, Session>>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: impl Into<String>, password_hash: Option<String>, private: bool) -> Self {
        Self {
            name: name.into(),
            password_hash,
            private,
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Room name (immutable after creation)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the room is hidden from the public directory
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Whether joining requires a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// The stored bcrypt hash, if any
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Current member count
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Whether the room has no members
    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    /// Assigned username of a current member
    pub async fn username_of(&self, id: SessionId) -> Option<String> {
        self.members.read().await.get(&id).map(|s| s.username.clone())
    }

    /// Add a session, assigning a username unique within the room.
    ///
    /// Deduplication and insertion happen under the same exclusive
    /// lock, so the returned name is unused at insertion time even
    /// under concurrent joins. Returns the assigned name and the new
    /// member count.
    pub async fn add(&self, mut session: Session) -> (String, usize) {
        let mut members = self.members.write().await;
        let username = assign_username(&members, &session.username);
        session.username = username.clone();
        members.insert(session.id, session);
        (username, members.len())
    }

    /// Remove a member.
    ///
    /// Idempotent: returns `None` when the session is not present (for
    /// example already dropped during a failed broadcast). Otherwise
    /// returns the removed session and the new member count.
    pub async fn remove(&self, id: SessionId) -> Option<(Session, usize)> {
        let mut members = self.members.write().await;
        let session = members.remove(&id)?;
        Some((session, members.len()))
    }

    /// Deliver `payload` to every current member.
    ///
    /// Runs under the shared lock; a failed send marks that member as
    /// disconnected and delivery continues to the rest. Failed members
    /// are removed before this method returns (same pass, not a
    /// deferred cleanup); dropping their session closes the connection.
    /// Returns the member count after the pass.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let mut dropped = Vec::new();
        {
            let members = self.members.read().await;
            for (id, session) in members.iter() {
                if session.send(payload.to_owned()).await.is_err() {
                    dropped.push(*id);
                }
            }
            if dropped.is_empty() {
                return members.len();
            }
        }

        let mut members = self.members.write().await;
        for id in dropped {
            debug!("member {} unreachable, dropped from room '{}'", id, self.name);
            members.remove(&id);
        }
        members.len()
    }
}

/// Pick a username not currently in use in `members`.
///
/// The requested name wins if free; otherwise suffixes 1..=100 are
/// probed in order and the first free candidate wins. When all hundred
/// are taken, a hex nanosecond timestamp is appended unconditionally,
/// which guarantees termination.
fn assign_username(members: &HashMap<SessionId, Session>, requested: &str) -> String {
    let in_use = |name: &str| members.values().any(|s| s.username == name);

    if !in_use(requested) {
        return requested.to_string();
    }

    for i in 1..=SUFFIX_PROBE_LIMIT {
        let candidate = format!("{requested}{i}");
        if !in_use(&candidate) {
            return candidate;
        }
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{requested}{nanos:x}")
}
