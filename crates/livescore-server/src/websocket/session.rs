//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use livescore_core::ConnectionId;
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::hub::{BroadcastHub, ConnectionHandle, Frame};
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// How long the writer gets to send its close frame after disconnect.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-session knobs taken from [`ServerConfig`].
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Ping period.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before the connection is closed.
    pub heartbeat_timeout: Duration,
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity.max(1),
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Spawns the writer (drains the outbound queue, sends pings) and the
///    heartbeat monitor
/// 2. Registers with the hub, which pushes the initial state
/// 3. Reads until the client closes, the socket fails or the connection is
///    closed from our side
/// 4. Calls `on_disconnect` exactly once
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    hub: Arc<BroadcastHub>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Frame>(config.send_queue_capacity);
    let cancel = shutdown.child_token();
    let connection = Arc::new(ClientConnection::new(conn_id, send_tx, cancel.clone()));

    let started = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let mut writer = {
        let cancel = cancel.clone();
        let ping_every = config.heartbeat_interval;
        tokio::spawn(
            async move {
                let mut ping_interval = tokio::time::interval(ping_every);
                // Skip the immediate first tick
                let _ = ping_interval.tick().await;

                loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        frame = send_rx.recv() => {
                            let Some(frame) = frame else { break };
                            if ws_tx.send(Message::Text(String::from(&*frame).into())).await.is_err() {
                                debug!("write failed");
                                break;
                            }
                        }
                        _ = ping_interval.tick() => {
                            if ws_tx.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                                debug!("ping failed");
                                break;
                            }
                        }
                    }
                }

                let _ = ws_tx.send(Message::Close(None)).await;
                // A dead writer means a dead connection.
                cancel.cancel();
            }
            .in_current_span(),
        )
    };

    let heartbeat = {
        let connection = connection.clone();
        let cancel = cancel.clone();
        tokio::spawn(
            async move {
                let result = run_heartbeat(
                    connection.clone(),
                    config.heartbeat_interval,
                    config.heartbeat_timeout,
                    cancel,
                )
                .await;
                if result == HeartbeatResult::TimedOut {
                    warn!(
                        silent_for = ?connection.last_pong_elapsed(),
                        "client unresponsive, closing"
                    );
                    connection.close();
                }
            }
            .in_current_span(),
        )
    };

    let handle: Arc<dyn ConnectionHandle> = connection.clone();
    match hub.on_connect(handle).await {
        Ok(state) => {
            debug!(games = state.games.len(), "registered");
            read_until_closed(&connection, &mut ws_rx).await;
        }
        Err(error) => warn!(%error, "registration failed"),
    }

    hub.on_disconnect(connection.as_ref());

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    let _ = heartbeat.await;

    info!(age = ?connection.age(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

async fn read_until_closed<S>(connection: &ClientConnection, ws_rx: &mut S)
where
    S: futures::Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        tokio::select! {
            () = connection.closed() => {
                debug!("connection closed locally");
                break;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) => {
                    info!("client sent close frame");
                    break;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => connection.mark_alive(),
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    // Clients are receive-only; inbound data only proves liveness.
                    connection.mark_alive();
                }
                Some(Err(error)) => {
                    debug!(%error, "receive failed");
                    break;
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_from_server_config() {
        let server = ServerConfig {
            send_queue_capacity: 0,
            heartbeat_interval_ms: 500,
            heartbeat_timeout_ms: 1_500,
            ..ServerConfig::default()
        };
        let config = SessionConfig::from(&server);
        assert_eq!(config.send_queue_capacity, 1);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(500));
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn reader_stops_when_connection_closes() {
        let (tx, _rx) = mpsc::channel(1);
        let connection = ClientConnection::new("c".into(), tx, CancellationToken::new());
        let mut stream = futures::stream::pending::<Result<Message, axum::Error>>();
        connection.close();
        tokio::time::timeout(Duration::from_secs(1), read_until_closed(&connection, &mut stream))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reader_marks_alive_and_stops_on_close_frame() {
        let (tx, _rx) = mpsc::channel(1);
        let connection = ClientConnection::new("c".into(), tx, CancellationToken::new());
        let _ = connection.check_alive();

        let mut stream = futures::stream::iter(vec![
            Ok(Message::Pong(Vec::<u8>::new().into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("never read".into())),
        ]);
        read_until_closed(&connection, &mut stream).await;

        assert!(connection.check_alive());
        assert!(stream.next().await.is_some());
    }

    #[tokio::test]
    async fn reader_stops_at_end_of_stream() {
        let (tx, _rx) = mpsc::channel(1);
        let connection = ClientConnection::new("c".into(), tx, CancellationToken::new());
        let mut stream = futures::stream::empty::<Result<Message, axum::Error>>();
        read_until_closed(&connection, &mut stream).await;
        assert!(!connection.is_closed());
    }
}
