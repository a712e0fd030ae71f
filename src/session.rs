//! Session struct definition
//!
//! Represents one connection's identity within a room.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::SessionId;

/// A connected member of a room
///
/// `username` holds the requested name until the hub adds the session
/// to a room, at which point it is replaced with the deduplicated name.
/// The sender feeds the connection's write task; dropping the session
/// closes the channel, which ends the write task and closes the socket.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Display name, unique within the owning room
    pub username: String,
    /// Server -> connection outbound channel
    sender: mpsc::Sender<String>,
}

impl Session {
    /// Create a session with the requested username
    pub fn new(id: SessionId, username: String, sender: mpsc::Sender<String>) -> Self {
        Self { id, username, sender }
    }

    /// Queue a text frame for this session's connection.
    ///
    /// Waits for buffer space if the connection is slow. Fails only
    /// when the write task has exited (connection gone).
    pub async fn send(&self, payload: String) -> Result<(), SendError> {
        self.sender
            .send(payload)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
