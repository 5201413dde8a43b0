//! End-to-end integration tests using real WebSocket and HTTP clients.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use livescore_core::{GameStatus, Scoreboard, ServerMessage};
use livescore_server::{ScoreboardServer, ServerConfig};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    server: Arc<ScoreboardServer>,
    base_url: String,
    ws_url: String,
    http: reqwest::Client,
}

/// Boot a server on an ephemeral port with an empty scoreboard.
async fn boot_server(config: ServerConfig) -> TestServer {
    let server = Arc::new(ScoreboardServer::new(config, Scoreboard::new(), None));
    let (addr, _handle) = server.listen().await.unwrap();
    TestServer {
        server,
        base_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
        http: reqwest::Client::new(),
    }
}

impl TestServer {
    async fn connect(&self) -> WsStream {
        let (ws, _) = timeout(TIMEOUT, connect_async(self.ws_url.as_str()))
            .await
            .unwrap()
            .unwrap();
        ws
    }

    async fn post_event(&self, event: Value) -> reqwest::Response {
        self.http
            .post(format!("{}/events", self.base_url))
            .json(&event)
            .send()
            .await
            .unwrap()
    }

    async fn health(&self) -> Value {
        self.http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

/// Read the next text frame as a server message, skipping control frames.
async fn next_message(ws: &mut WsStream) -> ServerMessage {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert nothing arrives within a short window.
async fn assert_silent(ws: &mut WsStream) {
    let res = timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}

fn fixture() -> Value {
    json!({"type": "fixture", "gameId": "g1", "homeTeam": "Silver Strikers", "awayTeam": "Civo United"})
}

fn goal(player: &str, minute: u8) -> Value {
    json!({"type": "goal", "gameId": "g1", "side": "home", "playerName": player, "minute": minute})
}

#[tokio::test]
async fn late_joiner_gets_snapshot_not_replay() {
    let t = boot_server(ServerConfig::default()).await;

    let mut h1 = t.connect().await;
    assert_eq!(next_message(&mut h1).await, ServerMessage::InitialGames(vec![]));

    for event in [
        fixture(),
        json!({"type": "kickoff", "gameId": "g1"}),
        goal("Gabadinho Mhango", 12),
    ] {
        let resp = t.post_event(event).await;
        assert_eq!(resp.status(), 202);
    }

    let statuses: Vec<GameStatus> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            match next_message(&mut h1).await {
                ServerMessage::GameUpdate(game) => out.push(game.status),
                other => panic!("expected gameUpdate, got {other:?}"),
            }
        }
        out
    };
    assert_eq!(
        statuses,
        [GameStatus::Pending, GameStatus::Active, GameStatus::Active]
    );

    let mut h2 = t.connect().await;
    let ServerMessage::InitialGames(games) = next_message(&mut h2).await else {
        panic!("expected initialGames first");
    };
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].home_score, 1);
    assert_eq!(games[0].scorers[0].player_name, "Gabadinho Mhango");
    assert_silent(&mut h2).await;

    let resp = t.post_event(goal("Chiukepo Msowoya", 30)).await;
    assert_eq!(resp.status(), 202);
    let accepted: Value = resp.json().await.unwrap();
    assert_eq!(accepted["homeScore"], 2);

    for ws in [&mut h1, &mut h2] {
        let ServerMessage::GameUpdate(game) = next_message(ws).await else {
            panic!("expected gameUpdate");
        };
        assert_eq!(game.home_score, 2);
        assert_eq!(game.scorers.len(), 2);
    }
}

#[tokio::test]
async fn rejected_events_are_not_broadcast() {
    let t = boot_server(ServerConfig::default()).await;
    let mut ws = t.connect().await;
    let _ = next_message(&mut ws).await;

    let resp = t
        .http
        .post(format!("{}/events", t.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = t.post_event(json!({"type": "kickoff", "gameId": "missing"})).await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unknown_game");

    assert_eq!(t.post_event(fixture()).await.status(), 202);
    let _ = next_message(&mut ws).await;
    assert_eq!(t.post_event(goal("Early", 3)).await.status(), 409);
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn connection_limit_refuses_upgrade() {
    let t = boot_server(ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    })
    .await;

    let mut first = t.connect().await;
    let _ = next_message(&mut first).await;

    let err = connect_async(t.ws_url.as_str()).await.unwrap_err();
    match err {
        tungstenite::Error::Http(resp) => assert_eq!(resp.status(), 503),
        other => panic!("expected HTTP 503, got {other:?}"),
    }
    assert_eq!(t.server.hub().connection_count(), 1);
}

#[tokio::test]
async fn closed_client_is_removed() {
    let t = boot_server(ServerConfig::default()).await;
    let mut ws = t.connect().await;
    let _ = next_message(&mut ws).await;
    assert_eq!(t.health().await["connections"], 1);

    ws.send(Message::Close(None)).await.unwrap();
    drop(ws);

    timeout(TIMEOUT, async {
        while t.server.hub().connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("client was never removed");

    assert_eq!(t.post_event(fixture()).await.status(), 202);
    let health = t.health().await;
    assert_eq!(health["connections"], 0);
    assert_eq!(health["games"], 1);
}

#[tokio::test]
async fn shutdown_closes_clients() {
    let t = boot_server(ServerConfig::default()).await;
    let mut ws = t.connect().await;
    let _ = next_message(&mut ws).await;

    t.server.shutdown().shutdown();

    let closed = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client was not closed on shutdown");
}

#[tokio::test]
async fn games_endpoint_matches_broadcast_state() {
    let t = boot_server(ServerConfig::default()).await;
    assert_eq!(t.post_event(fixture()).await.status(), 202);

    let games: Vec<livescore_core::Game> = t
        .http
        .get(format!("{}/games", t.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].home_team, "Silver Strikers");

    let mut ws = t.connect().await;
    assert_eq!(next_message(&mut ws).await, ServerMessage::InitialGames(games));
}
