//! WebSocket client connection state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use livescore_core::ConnectionId;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::hub::{ConnectionHandle, Frame, SendError};

/// A connected WebSocket client as seen by the hub.
///
/// Frames go into a bounded queue drained by the session's writer task.
/// Closing cancels the connection token, which stops the writer, the reader
/// and the heartbeat.
pub struct ClientConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
}

impl ClientConnection {
    /// Create a new connection feeding `tx`, closed by cancelling `cancel`.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Frame>, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            cancel,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
        }
    }

    /// Whether `close` has been called (or the parent token cancelled).
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Mark the connection as alive (pong or any inbound frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[async_trait]
impl ConnectionHandle for ClientConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Waits for queue space; the hub bounds the wait with its send timeout.
    async fn send(&self, frame: Frame) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        tokio::select! {
            result = self.tx.send(frame) => result.map_err(|_| SendError::Closed),
            () = self.cancel.cancelled() => Err(SendError::Closed),
        }
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}
