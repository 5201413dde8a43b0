//! `ScoreboardServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use livescore_core::{ConnectionId, Scoreboard};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::feed::{FeedHandle, GameFeed};
use crate::health::{self, HealthResponse};
use crate::hub::BroadcastHub;
use crate::metrics::WS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{SessionConfig, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast hub for fan-out.
    pub hub: Arc<BroadcastHub>,
    /// Producer/reader handle to the game feed.
    pub feed: FeedHandle,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The livescore server.
pub struct ScoreboardServer {
    config: Arc<ServerConfig>,
    hub: Arc<BroadcastHub>,
    feed: FeedHandle,
    feed_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl ScoreboardServer {
    /// Create a server owning `board` and start its game feed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig, board: Scoreboard, metrics: Option<PrometheusHandle>) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let (feed, feed_handle) = GameFeed::new(board);
        let hub = Arc::new(BroadcastHub::new(
            Arc::new(feed.snapshots()),
            config.send_timeout(),
        ));
        let feed_task = feed.spawn(hub.clone(), shutdown.token());

        Self {
            config: Arc::new(config),
            hub,
            feed: feed_handle,
            feed_task: Mutex::new(Some(feed_task)),
            shutdown,
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            feed: self.feed.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/events", post(api::submit_event))
            .route("/games", get(api::list_games))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the server task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, "livescore server listening");
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "server stopped with error");
            }
        });
        Ok((addr, handle))
    }

    /// Background tasks owned by the server, for graceful shutdown.
    /// Returns them once; later calls return an empty list.
    pub fn take_background_tasks(&self) -> Vec<JoinHandle<()>> {
        self.feed_task.lock().take().into_iter().collect()
    }

    /// Get the broadcast hub.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get the feed handle.
    pub fn feed(&self) -> &FeedHandle {
        &self.feed
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limit = state.config.max_connections;
    if state.hub.connection_count() >= limit {
        counter!(WS_REJECTED_TOTAL).increment(1);
        warn!(limit, "connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let conn_id = ConnectionId::generate();
    let session = SessionConfig::from(state.config.as_ref());
    let hub = state.hub.clone();
    let shutdown = state.shutdown.token();

    ws.max_message_size(state.config.max_message_size)
        .on_failed_upgrade(|err| warn!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, hub, session, shutdown))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.hub.connection_count(),
        state.feed.game_count(),
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::Utc;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn make_server() -> ScoreboardServer {
        ScoreboardServer::new(ServerConfig::default(), Scoreboard::seeded(Utc::now()), None)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_event(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_counts() {
        let server = make_server();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["games"], 3);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn games_endpoint_lists_snapshot() {
        let server = make_server();
        let req = Request::builder().uri("/games").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed.as_array().unwrap().len(), 3);
        assert_eq!(parsed[0]["id"], "game1");
        assert_eq!(parsed[2]["scorers"][0]["playerName"], "Chikondi Banda");
    }

    #[tokio::test]
    async fn accepted_event_returns_updated_game() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(post_event(
                r#"{"type":"goal","gameId":"game1","side":"home","playerName":"Player 1","minute":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["homeScore"], 1);
        assert_eq!(parsed["scorers"][0]["team"], "Nyasa Big Bullets");

        let game1 = server.feed().games().into_iter().next().unwrap();
        assert_eq!(game1.home_score, 1);
    }

    #[tokio::test]
    async fn malformed_event_is_bad_request() {
        let server = make_server();
        for body in [r#"{"type":"goal""#, r#"{"type":"penalty","gameId":"game1"}"#] {
            let resp = server.router().oneshot(post_event(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(resp).await["error"], "invalid_event");
        }
    }

    #[tokio::test]
    async fn rule_violations_map_to_statuses() {
        let server = make_server();
        let cases = [
            (r#"{"type":"kickoff","gameId":"game9"}"#, StatusCode::NOT_FOUND),
            (r#"{"type":"kickoff","gameId":"game1"}"#, StatusCode::CONFLICT),
            (
                r#"{"type":"fixture","gameId":"game1","homeTeam":"A","awayTeam":"B"}"#,
                StatusCode::CONFLICT,
            ),
            (
                r#"{"type":"goal","gameId":"game1","side":"home","playerName":"X","minute":200}"#,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (body, status) in cases {
            let resp = server.router().oneshot(post_event(body)).await.unwrap();
            assert_eq!(resp.status(), status, "{body}");
        }
        assert_eq!(server.feed().games()[0].home_score, 0);
    }

    #[tokio::test]
    async fn stopped_feed_is_service_unavailable() {
        let server = make_server();
        server.shutdown().shutdown();
        for task in server.take_background_tasks() {
            task.await.unwrap();
        }
        let resp = server
            .router()
            .oneshot(post_event(r#"{"type":"kickoff","gameId":"game2"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_endpoint_requires_recorder() {
        let server = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = ScoreboardServer::new(ServerConfig::default(), Scoreboard::new(), Some(handle));
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn plain_get_on_ws_is_rejected() {
        let server = make_server();
        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
        assert_eq!(server.hub().connection_count(), 0);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn background_tasks_taken_once() {
        let server = make_server();
        assert_eq!(server.take_background_tasks().len(), 1);
        assert!(server.take_background_tasks().is_empty());
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
