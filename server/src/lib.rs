//! Pong relay library.
//!
//! The relay is the session collaborator for the game peers: it keeps rooms,
//! elects and migrates the host, stores per-player custom properties and fans
//! sync messages out to room members. It never simulates the match.

pub mod config;
pub mod relay_loop;
pub mod room;
pub mod state;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::relay_loop::{run_relay_loop, RelayBroadcast, RelayCommand};
use crate::ws::{ws_handler, AppState};

/// Spawn the relay loop and build the router serving `/ws`.
pub fn build_app(config: ServerConfig) -> Router {
    let (relay_tx, relay_rx) = mpsc::channel::<RelayCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<RelayBroadcast>(256);

    let app_state = AppState {
        relay_tx,
        broadcast_tx: broadcast_tx.clone(),
        max_message_bytes: config.max_message_bytes,
        max_parse_errors: config.max_parse_errors,
    };

    tokio::spawn(async move {
        run_relay_loop(relay_rx, broadcast_tx, config).await;
    });

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
