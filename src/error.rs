//! Error types for the relay server
//!
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Registry-level failures reported by the hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Room name already registered (create conflict)
    #[error("room '{0}' already exists")]
    RoomExists(String),

    /// Password hashing failed during room creation.
    /// The room is not inserted; creation is aborted as a whole.
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

/// Failure to queue an outbound frame for a session
///
/// Occurs only when the session's write task has exited, which means
/// the underlying connection is gone.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the outbound channel has been closed
    #[error("connection closed")]
    ChannelClosed,
}
