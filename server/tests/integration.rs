//! Integration tests for the pong relay.
//!
//! These tests start a real relay instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use pong_server::build_app;
use pong_server::config::ServerConfig;
use pong_shared::protocol::{ClientMsg, ServerMsg, SyncEnvelope, SyncMsg};
use pong_shared::team::Team;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Start a relay on a random available port and return its base WebSocket URL.
async fn start_test_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        ..Default::default()
    };
    let app = build_app(config);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(base: &str, room: &str, nick: &str) -> Ws {
    let url = format!("{}?room={}&nick={}", base, room, nick);
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Wait up to `timeout` for a message matching `pred`, skipping others.
async fn recv_matching<F>(ws: &mut Ws, timeout: Duration, mut pred: F) -> Option<ServerMsg>
where
    F: FnMut(&ServerMsg) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            let msg = recv_msg(ws).await;
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .ok()
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn welcome(ws: &mut Ws) -> (u32, u32) {
    match recv_msg(ws).await {
        ServerMsg::Welcome(w) => (w.self_id, w.host_id),
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

fn sync(seq: u64, msg: SyncMsg) -> ClientMsg {
    ClientMsg::Sync {
        envelope: SyncEnvelope { seq, msg },
    }
}

fn is_sync(msg: &ServerMsg) -> bool {
    matches!(msg, ServerMsg::Sync(_))
}

/// Poll until the server closes the connection.
async fn wait_for_disconnect(ws: &mut Ws) -> bool {
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        match tokio::time::timeout(Duration::from_millis(100), ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return true,
            Err(_) => {
                if ws.send(Message::Ping(vec![].into())).await.is_err() {
                    return true;
                }
            }
            _ => continue,
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_first_player_is_host_on_team_zero() {
    let url = start_test_server().await;
    let mut ws = connect(&url, "alpha", "ana").await;

    match recv_msg(&mut ws).await {
        ServerMsg::Welcome(w) => {
            assert_eq!(w.protocol_version, 1);
            assert_eq!(w.host_id, w.self_id);
            assert_eq!(w.room, "alpha");
            assert_eq!(w.players.len(), 1);
            assert_eq!(w.players[0].nick, "ana");
            assert_eq!(w.players[0].team, Some(Team::Zero));
            assert_eq!(w.config.winning_score, 5);
        }
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_second_player_balances_teams() {
    let url = start_test_server().await;
    let mut ws1 = connect(&url, "alpha", "ana").await;
    let (id1, _) = welcome(&mut ws1).await;

    let mut ws2 = connect(&url, "alpha", "ben").await;
    match recv_msg(&mut ws2).await {
        ServerMsg::Welcome(w) => {
            assert_ne!(w.self_id, id1);
            assert_eq!(w.host_id, id1);
            let me = w.players.iter().find(|p| p.id == w.self_id).unwrap();
            assert_eq!(me.team, Some(Team::One));
        }
        other => panic!("Expected Welcome, got {:?}", other),
    }

    // Existing member hears about the newcomer
    let update = recv_matching(&mut ws1, Duration::from_millis(500), |m| {
        matches!(m, ServerMsg::PlayersState(p) if p.players.len() == 2)
    })
    .await;
    assert!(update.is_some(), "host should receive players_state");
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let url = start_test_server().await;
    let mut ws1 = connect(&url, "alpha", "ana").await;
    let (id1, host1) = welcome(&mut ws1).await;
    let mut ws2 = connect(&url, "beta", "ben").await;
    let (id2, host2) = welcome(&mut ws2).await;

    assert_eq!(host1, id1);
    assert_eq!(host2, id2);

    send(&mut ws1, &sync(1, SyncMsg::Score { team0: 1, team1: 0 })).await;
    let leaked = recv_matching(&mut ws2, Duration::from_millis(200), is_sync).await;
    assert!(leaked.is_none(), "sync must stay inside its room");
}

#[tokio::test]
async fn test_host_sync_is_relayed_to_others() {
    let url = start_test_server().await;
    let mut host = connect(&url, "alpha", "ana").await;
    let (host_id, _) = welcome(&mut host).await;
    let mut guest = connect(&url, "alpha", "ben").await;
    welcome(&mut guest).await;

    send(&mut host, &sync(7, SyncMsg::Direction { x: 0.6, y: -0.8 })).await;

    match recv_matching(&mut guest, Duration::from_millis(500), is_sync).await {
        Some(ServerMsg::Sync(relayed)) => {
            assert_eq!(relayed.from, host_id);
            assert_eq!(relayed.envelope.seq, 7);
            assert_eq!(relayed.envelope.msg, SyncMsg::Direction { x: 0.6, y: -0.8 });
        }
        other => panic!("Expected relayed sync, got {:?}", other),
    }

    // No echo back to the sender
    let echo = recv_matching(&mut host, Duration::from_millis(200), is_sync).await;
    assert!(echo.is_none());
}

#[tokio::test]
async fn test_guest_cannot_publish_ball_state() {
    let url = start_test_server().await;
    let mut host = connect(&url, "alpha", "ana").await;
    welcome(&mut host).await;
    let mut guest = connect(&url, "alpha", "ben").await;
    let (guest_id, _) = welcome(&mut guest).await;

    send(&mut guest, &sync(1, SyncMsg::Position { pos: [1.0, 1.0, 0.0] })).await;
    let dropped = recv_matching(&mut host, Duration::from_millis(200), is_sync).await;
    assert!(dropped.is_none(), "ball state from a guest must be dropped");

    // But its own paddle is fine
    send(
        &mut guest,
        &sync(2, SyncMsg::Paddle { owner_id: guest_id, y: 1.5 }),
    )
    .await;
    let relayed = recv_matching(&mut host, Duration::from_millis(500), is_sync).await;
    assert!(relayed.is_some(), "owner paddle update should be relayed");
}

#[tokio::test]
async fn test_host_migrates_when_host_leaves() {
    let url = start_test_server().await;
    let mut host = connect(&url, "alpha", "ana").await;
    let (host_id, _) = welcome(&mut host).await;
    let mut guest = connect(&url, "alpha", "ben").await;
    let (guest_id, _) = welcome(&mut guest).await;

    host.close(None).await.unwrap();

    let left = recv_matching(&mut guest, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::PlayerLeft(_))
    })
    .await;
    match left {
        Some(ServerMsg::PlayerLeft(p)) => {
            assert_eq!(p.id, host_id);
            assert_eq!(p.nick, "ana");
        }
        other => panic!("Expected PlayerLeft, got {:?}", other),
    }

    let changed = recv_matching(&mut guest, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::HostChanged(_))
    })
    .await;
    match changed {
        Some(ServerMsg::HostChanged(h)) => assert_eq!(h.host_id, guest_id),
        other => panic!("Expected HostChanged, got {:?}", other),
    }

    // The new host may now publish ball state
    let mut late = connect(&url, "alpha", "cat").await;
    welcome(&mut late).await;
    send(&mut guest, &sync(100, SyncMsg::Score { team0: 0, team1: 1 })).await;
    assert!(recv_matching(&mut late, Duration::from_millis(500), is_sync)
        .await
        .is_some());
}

#[tokio::test]
async fn test_start_match_requires_ready_and_closes_room() {
    let url = start_test_server().await;
    let mut host = connect(&url, "alpha", "ana").await;
    welcome(&mut host).await;
    let mut guest = connect(&url, "alpha", "ben").await;
    welcome(&mut guest).await;

    // Not everyone ready: refused
    send(&mut host, &ClientMsg::StartMatch).await;
    let started = recv_matching(&mut guest, Duration::from_millis(200), |m| {
        matches!(m, ServerMsg::MatchStarted)
    })
    .await;
    assert!(started.is_none());

    for ws in [&mut host, &mut guest] {
        send(
            ws,
            &ClientMsg::SetProperties {
                team: None,
                ready: Some(true),
            },
        )
        .await;
    }
    // Wait until the relay has seen both flags
    let all_ready = recv_matching(&mut host, Duration::from_secs(1), |m| {
        matches!(m, ServerMsg::PlayersState(p) if p.players.iter().all(|p| p.ready))
    })
    .await;
    assert!(all_ready.is_some());

    send(&mut host, &ClientMsg::StartMatch).await;
    for ws in [&mut host, &mut guest] {
        let started = recv_matching(ws, Duration::from_secs(1), |m| {
            matches!(m, ServerMsg::MatchStarted)
        })
        .await;
        assert!(started.is_some(), "all members should see match_started");
    }

    let mut late = connect(&url, "alpha", "cat").await;
    match recv_msg(&mut late).await {
        ServerMsg::JoinRejected(r) => assert_eq!(r.reason, "Match already in progress"),
        other => panic!("Expected JoinRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_room_rejects_join() {
    let url = start_test_server().await;
    let mut members = Vec::new();
    for i in 0..4 {
        let mut ws = connect(&url, "alpha", &format!("p{}", i)).await;
        welcome(&mut ws).await;
        members.push(ws);
    }

    let mut extra = connect(&url, "alpha", "extra").await;
    match recv_msg(&mut extra).await {
        ServerMsg::JoinRejected(r) => assert_eq!(r.reason, "Room is full"),
        other => panic!("Expected JoinRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_message_disconnects_client() {
    let url = start_test_server().await;
    let mut ws = connect(&url, "alpha", "ana").await;
    welcome(&mut ws).await;

    let huge_payload = "x".repeat(2000);
    let msg = format!(
        r#"{{"type":"set_properties","ready":true,"extra":"{}"}}"#,
        huge_payload
    );
    let _ = ws.send(Message::Text(msg.into())).await;

    assert!(
        wait_for_disconnect(&mut ws).await,
        "Client should be disconnected after oversized message"
    );
}

#[tokio::test]
async fn test_parse_spam_disconnects_client() {
    let url = start_test_server().await;
    let mut ws = connect(&url, "alpha", "ana").await;
    welcome(&mut ws).await;

    for _ in 0..10 {
        let _ = ws.send(Message::Text("not valid json".into())).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        wait_for_disconnect(&mut ws).await,
        "Client should be disconnected after too many parse errors"
    );
}
