//! Relay server entry point
//!
//! Starts the hub event loop and the HTTP listener.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::{router, AppState, Hub};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default shared token guarding the directory endpoint,
/// overridable via the DIRECTORY_TOKEN environment variable
const DEFAULT_DIRECTORY_TOKEN: &str = "public-chat-token";

/// Channel buffer size for hub events
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let directory_token = env::var("DIRECTORY_TOKEN")
        .unwrap_or_else(|_| DEFAULT_DIRECTORY_TOKEN.to_string());

    // Start the hub event loop
    let hub = Arc::new(Hub::new());
    let (events, event_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(Arc::clone(&hub).run(event_rx));

    let state = AppState {
        hub,
        events,
        directory_token: directory_token.into(),
    };

    let listener = TcpListener::bind(&addr).await?;
    info!("relay server listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
