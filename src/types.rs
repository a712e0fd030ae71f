//! Basic type definitions for the relay server
//!
//! Provides the session identifier and the process-wide user counter
//! that also numbers generated guest names.

use std::sync::atomic::{AtomicU64, Ordering};

static USER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Take the next value from the process-wide user counter.
///
/// The same counter backs session ids and generated `Guest<N>` names,
/// so a guest's display number never collides with another guest's.
pub fn next_user_id() -> u64 {
    USER_ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Unique session identifier (newtype pattern)
///
/// Process-unique integer, monotonically assigned.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Assign the next session id
    pub fn next() -> Self {
        Self(next_user_id())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
