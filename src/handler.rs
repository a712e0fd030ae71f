//! HTTP surface and connection lifecycle
//!
//! Two routes: `/ws` negotiates room access from query parameters and
//! upgrades to a websocket session; `/rooms` serves the token-guarded
//! public room directory. Each established session runs one reader
//! task feeding hub events and one writer task draining the session's
//! outbound channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::HubError;
use crate::hub::{Hub, HubEvent, RoomInfo};
use crate::room::Room;
use crate::session::Session;
use crate::types::{next_user_id, SessionId};

/// Room joined when the client names none
pub const DEFAULT_ROOM: &str = "default";

/// Outbound frame buffer per session
const OUTBOUND_BUFFER: usize = 32;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub events: mpsc::Sender<HubEvent>,
    pub directory_token: Arc<str>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms", get(rooms_handler).layer(cors))
        .with_state(state)
}

/// Query parameters accepted on the websocket upgrade
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub password: String,
    /// Only meaningful with `action=create`
    #[serde(default)]
    pub private: bool,
}

/// Websocket attach endpoint
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let room = match resolve_room(&state.hub, &params).await {
        Ok(room) => room,
        Err(status) => return status.into_response(),
    };

    let username = if params.username.is_empty() {
        format!("Guest{}", next_user_id())
    } else {
        params.username.clone()
    };

    ws.on_upgrade(move |socket| run_session(socket, state, room, username))
}

/// Resolve the target room for an upgrade request.
///
/// `action=create` conflicts (409) on a taken name. Any other action
/// joins: an unknown room is implicitly created open and public, and a
/// password mismatch on an existing room is rejected (401) before the
/// upgrade.
pub async fn resolve_room(hub: &Hub, params: &ConnectParams) -> Result<Arc<Room>, StatusCode> {
    let name = if params.room.is_empty() {
        DEFAULT_ROOM
    } else {
        params.room.as_str()
    };

    if params.action == "create" {
        return match hub.create_room(name, &params.password, params.private).await {
            Ok(room) => Ok(room),
            Err(HubError::RoomExists(_)) => Err(StatusCode::CONFLICT),
            Err(e) => {
                warn!("room creation failed: {e}");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
    }

    if let Some(room) = hub.get_room(name).await {
        if !hub.verify_password(name, &params.password).await {
            return Err(StatusCode::UNAUTHORIZED);
        }
        return Ok(room);
    }

    match hub.create_room(name, "", false).await {
        Ok(room) => Ok(room),
        // Lost an implicit-create race; the winner's room stands.
        Err(HubError::RoomExists(_)) => hub
            .get_room(name)
            .await
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR),
        Err(e) => {
            warn!("implicit room creation failed: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Drive one established session until its connection closes.
///
/// Registration happens first; deregistration is sent unconditionally
/// when the read loop ends, whatever the reason, so cleanup runs
/// exactly once per session.
async fn run_session(socket: WebSocket, state: AppState, room: Arc<Room>, username: String) {
    let id = SessionId::next();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let session = Session::new(id, username, tx);
    if state
        .events
        .send(HubEvent::Register {
            room: Arc::clone(&room),
            session,
        })
        .await
        .is_err()
    {
        // Hub gone; dropping both socket halves closes the connection.
        debug!("hub closed, dropping session {id}");
        return;
    }

    // Write task: outbound channel -> websocket. Ends when the session
    // is removed from its room (sender dropped) or the socket breaks.
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                debug!("websocket send failed, ending write task");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Read loop: every inbound text frame becomes a broadcast event.
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let event = HubEvent::Broadcast {
                    room: Arc::clone(&room),
                    sender: id,
                    body: text,
                };
                if state.events.send(event).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("session {id} sent close frame");
                break;
            }
            // Ping/pong is answered by the protocol layer; binary
            // frames are ignored.
            Ok(_) => {}
            Err(e) => {
                debug!("session {id} read error: {e}");
                break;
            }
        }
    }

    let _ = state
        .events
        .send(HubEvent::Unregister { room, id })
        .await;
}

#[derive(Debug, Deserialize)]
struct DirectoryQuery {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Serialize)]
struct DirectoryResponse {
    rooms: Vec<RoomInfo>,
}

/// Public room directory, guarded by the shared static token
async fn rooms_handler(
    Query(query): Query<DirectoryQuery>,
    State(state): State<AppState>,
) -> Response {
    if query.token.is_empty() || query.token != *state.directory_token {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let rooms = state.hub.list_rooms().await;
    Json(DirectoryResponse { rooms }).into_response()
}
