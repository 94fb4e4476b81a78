use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::relay_loop::{RelayBroadcast, RelayCommand};
use pong_shared::protocol::{ClientMsg, JoinRejectedMsg, ServerMsg};

const DEFAULT_ROOM: &str = "practice";
const MAX_NAME_LEN: usize = 32;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub relay_tx: mpsc::Sender<RelayCommand>,
    pub broadcast_tx: broadcast::Sender<RelayBroadcast>,
    pub max_message_bytes: usize,
    pub max_parse_errors: u32,
}

/// Query string of the WebSocket URL: `/ws?room=<name>&nick=<nick>`
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub room: Option<String>,
    pub nick: Option<String>,
}

impl JoinParams {
    /// Room name, falling back to the shared practice room.
    pub fn room_name(&self) -> String {
        clean_name(self.room.as_deref()).unwrap_or_else(|| DEFAULT_ROOM.to_string())
    }

    /// Nickname, falling back to a random `Player_NNNN`.
    pub fn nickname(&self) -> String {
        clean_name(self.nick.as_deref()).unwrap_or_else(|| {
            let n: u32 = rand::thread_rng().gen_range(1000..10000);
            format!("Player_{}", n)
        })
    }
}

fn clean_name(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_LEN).collect())
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, app_state))
}

async fn handle_socket(socket: WebSocket, params: JoinParams, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let room = params.room_name();

    // Subscribe before joining so nothing sent after our welcome is missed
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .relay_tx
        .send(RelayCommand::Join {
            room: room.clone(),
            nick: params.nickname(),
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Join command");
        return;
    }

    let (my_id, welcome) = match resp_rx.await {
        Ok(Ok(result)) => result,
        Ok(Err(reason)) => {
            let msg = ServerMsg::JoinRejected(JoinRejectedMsg { reason });
            if let Ok(json) = serde_json::to_string(&msg) {
                let _ = sink.send(Message::Text(json.into())).await;
            }
            let _ = sink.close().await;
            return;
        }
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    tracing::info!(player_id = my_id, room = %room, "Player connected");

    match serde_json::to_string(&ServerMsg::Welcome(welcome)) {
        Ok(json) => {
            if sink.send(Message::Text(json.into())).await.is_err() {
                leave(&app_state, my_id).await;
                return;
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize welcome");
            leave(&app_state, my_id).await;
            return;
        }
    }

    let mut parse_errors = 0u32;

    loop {
        tokio::select! {
            // Client -> Relay
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::warn!(player_id = my_id, bytes = text.len(), "Oversized message, disconnecting");
                            break;
                        }
                        let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                parse_errors += 1;
                                if parse_errors >= app_state.max_parse_errors {
                                    tracing::warn!(player_id = my_id, "Too many parse errors, disconnecting");
                                    break;
                                }
                                continue;
                            }
                        };
                        let cmd = match client_msg {
                            ClientMsg::SetProperties { team, ready } => {
                                RelayCommand::SetProperties { id: my_id, team, ready }
                            }
                            ClientMsg::StartMatch => RelayCommand::StartMatch { id: my_id },
                            ClientMsg::Sync { envelope } => RelayCommand::Sync { id: my_id, envelope },
                        };
                        if app_state.relay_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if data.len() > app_state.max_message_bytes {
                            tracing::warn!(player_id = my_id, bytes = data.len(), "Oversized message, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // Ignore ping/pong
                }
            }

            // Relay -> Client
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        if !broadcast.is_for(&room, my_id) {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&broadcast.msg) {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Skipped messages may include one-shot host or roster changes
                        tracing::warn!(player_id = my_id, lagged = n, "Player lagged, resyncing");
                        if app_state.relay_tx.send(RelayCommand::Resync { id: my_id }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = sink.close().await;
    leave(&app_state, my_id).await;
    tracing::info!(player_id = my_id, "Player disconnected");
}

async fn leave(app_state: &AppState, id: u32) {
    let _ = app_state.relay_tx.send(RelayCommand::Leave { id }).await;
}
