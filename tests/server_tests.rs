use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use position_sync_server::game::{run_broadcast_loop, PlayerId, Position};
use position_sync_server::ws::protocol::ServerMsg;
use position_sync_server::{build_router, AppState, Config};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Helper to create test configuration with a fast tick
fn test_config() -> Config {
    Config {
        tick_interval: Duration::from_millis(20),
        ..Config::default()
    }
}

/// Helper to start a full server on an ephemeral port
async fn start_server() -> (SocketAddr, watch::Sender<bool>) {
    let config = test_config();
    let state = AppState::new(config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(run_broadcast_loop(
        state.engine.clone(),
        config.tick_interval,
        shutdown_rx,
    ));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    let router = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, shutdown_tx)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("WebSocket connect failed");
    ws
}

async fn next_msg(ws: &mut Client) -> ServerMsg {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("Timed out waiting for server message")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("Server sent invalid JSON");
        }
    }
}

/// Skip periodic snapshots until a message of another kind arrives
async fn next_event(ws: &mut Client) -> ServerMsg {
    loop {
        match next_msg(ws).await {
            ServerMsg::StateUpdate { .. } => continue,
            other => return other,
        }
    }
}

async fn next_state_update(ws: &mut Client) -> std::collections::BTreeMap<PlayerId, Position> {
    loop {
        if let ServerMsg::StateUpdate { players, .. } = next_msg(ws).await {
            return players;
        }
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send client message");
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    // GIVEN: An application with no connected players
    let app = build_router(AppState::new(test_config()));

    // WHEN: Making a GET request to /health
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // THEN: Status is OK and the body reports the engine state
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected_players"], 0);
    assert_eq!(body["tick_interval_ms"], 20);
}

// =============================================================================
// WEBSOCKET TESTS
// =============================================================================

#[tokio::test]
async fn test_full_session_over_websocket() {
    let (addr, _shutdown) = start_server().await;

    // A connects and gets a world containing only itself
    let mut ws_a = connect(addr).await;
    let (a, a_start) = match next_msg(&mut ws_a).await {
        ServerMsg::CurrentPlayers { your_id, players } => {
            assert_eq!(players.len(), 1);
            (your_id, players[&your_id])
        }
        other => panic!("expected current_players first, got {:?}", other),
    };

    // B connects: A hears about B, B sees both
    let mut ws_b = connect(addr).await;
    let b = match next_msg(&mut ws_b).await {
        ServerMsg::CurrentPlayers { your_id, players } => {
            assert_eq!(players.len(), 2);
            assert!(players.contains_key(&a));
            your_id
        }
        other => panic!("expected current_players first, got {:?}", other),
    };
    match next_event(&mut ws_a).await {
        ServerMsg::NewPlayer { id, .. } => assert_eq!(id, b),
        other => panic!("expected new_player, got {:?}", other),
    }

    // A moves left once; both eventually observe exactly one step
    send_json(&mut ws_a, serde_json::json!({ "type": "player_input", "left": true })).await;
    for ws in [&mut ws_a, &mut ws_b] {
        let moved = timeout(WAIT, async {
            loop {
                let players = next_state_update(ws).await;
                if players[&a].x != a_start.x {
                    return players;
                }
            }
        })
        .await
        .expect("Move never became visible");
        assert_eq!(moved[&a].x, a_start.x - 5.0);
        assert_eq!(moved[&a].y, a_start.y);
        assert!(moved.contains_key(&b));
    }

    // A leaves: B is told and later snapshots only contain B
    ws_a.close(None).await.unwrap();
    match next_event(&mut ws_b).await {
        ServerMsg::PlayerDisconnected { id } => assert_eq!(id, a),
        other => panic!("expected player_disconnected, got {:?}", other),
    }
    let players = next_state_update(&mut ws_b).await;
    assert_eq!(players.keys().copied().collect::<Vec<_>>(), vec![b]);
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let (addr, _shutdown) = start_server().await;
    let mut ws = connect(addr).await;
    let me = match next_msg(&mut ws).await {
        ServerMsg::CurrentPlayers { your_id, .. } => your_id,
        other => panic!("expected current_players first, got {:?}", other),
    };

    // WHEN: Sending garbage, an unknown message type and a binary frame
    ws.send(Message::Text("not json".to_string())).await.unwrap();
    send_json(&mut ws, serde_json::json!({ "type": "teleport", "x": 0 })).await;
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    // THEN: The connection stays up and keeps receiving snapshots
    let players = next_state_update(&mut ws).await;
    assert!(players.contains_key(&me));

    // AND: Ping still gets answered
    send_json(&mut ws, serde_json::json!({ "type": "ping", "t": 42 })).await;
    match next_event(&mut ws).await {
        ServerMsg::Pong { t, .. } => assert_eq!(t, 42),
        other => panic!("expected pong, got {:?}", other),
    }
}

#[tokio::test]
async fn test_state_update_message_is_inert() {
    let (addr, _shutdown) = start_server().await;
    let mut ws = connect(addr).await;
    let (me, start) = match next_msg(&mut ws).await {
        ServerMsg::CurrentPlayers { your_id, players } => (your_id, players[&your_id]),
        other => panic!("expected current_players first, got {:?}", other),
    };

    send_json(
        &mut ws,
        serde_json::json!({ "type": "player_state_update", "input_state": { "right": true } }),
    )
    .await;
    // Ping acts as a barrier: replies are queued after the state update is handled
    send_json(&mut ws, serde_json::json!({ "type": "ping", "t": 1 })).await;
    match next_event(&mut ws).await {
        ServerMsg::Pong { t, .. } => assert_eq!(t, 1),
        other => panic!("expected pong, got {:?}", other),
    }

    let players = next_state_update(&mut ws).await;
    assert_eq!(players[&me], start);
}
