//! Seams between the hub and the outside world.

use std::sync::Arc;

use async_trait::async_trait;
use livescore_core::{ConnectionId, InitialState};
use thiserror::Error;

/// A serialized wire frame, shared by every recipient of one publish.
pub type Frame = Arc<str>;

/// Why a frame could not be handed to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is closed or its writer has stopped.
    #[error("connection closed")]
    Closed,
    /// The outbound queue stayed full for the whole send timeout.
    #[error("send timed out")]
    TimedOut,
}

/// One live, message-oriented client connection.
///
/// Identity is [`ConnectionHandle::id`]; two handles with the same id are the
/// same connection. Inbound traffic is read by the session that owns the
/// socket, which reports closure through `BroadcastHub::on_disconnect`.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Stable identity of this connection.
    fn id(&self) -> &ConnectionId;

    /// Queue a frame for delivery.
    async fn send(&self, frame: Frame) -> Result<(), SendError>;

    /// Close the connection. Idempotent; interrupts the session's pending read.
    fn close(&self);
}

/// Source of the current domain snapshot pushed to new connections.
pub trait SnapshotSource: Send + Sync {
    /// Current state, copied.
    fn snapshot(&self) -> InitialState;
}
