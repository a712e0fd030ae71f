//! Room-based WebSocket Message Relay
//!
//! Clients attach over a websocket to a named room and receive every
//! frame broadcast to that room. Rooms can be password protected
//! (bcrypt-hashed, never stored in plaintext) and flagged private to
//! hide them from the public directory.
//!
//! # Architecture
//! A single [`Hub`] task serializes all register/unregister/broadcast
//! events received over an `mpsc` queue, so membership changes and
//! fan-out are never interleaved. Each connection runs one reader task
//! pushing typed events into that queue and one writer task draining
//! the session's outbound channel. The room registry and each room's
//! membership sit behind `RwLock`s: exclusive for structural changes,
//! shared for lookups, broadcasts and the directory listing.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use chat_relay::{router, AppState, Hub};
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = Arc::new(Hub::new());
//!     let (events, event_rx) = mpsc::channel(256);
//!     tokio::spawn(Arc::clone(&hub).run(event_rx));
//!
//!     let state = AppState { hub, events, directory_token: "token".into() };
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, router(state)).await.unwrap();
//! }
//! ```

pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod room;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use error::{HubError, SendError};
pub use handler::{router, AppState, ConnectParams, DEFAULT_ROOM};
pub use hub::{Hub, HubEvent, RoomInfo};
pub use room::Room;
pub use session::Session;
pub use types::SessionId;
