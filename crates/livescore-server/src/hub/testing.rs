//! In-memory connection handle for hub tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use livescore_core::{ConnectionId, ServerMessage};
use parking_lot::Mutex;

use super::handle::{ConnectionHandle, Frame, SendError};

/// How a [`RecordingHandle`] reacts to `send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Record the frame.
    Accept,
    /// Fail with `Closed`.
    Fail,
    /// Never complete, like a client whose queue is full.
    Stall,
}

pub(crate) struct RecordingHandle {
    id: ConnectionId,
    frames: Mutex<Vec<Frame>>,
    behavior: Mutex<Behavior>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl RecordingHandle {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Self::with_behavior(id, Behavior::Accept)
    }

    pub(crate) fn with_behavior(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            frames: Mutex::new(Vec::new()),
            behavior: Mutex::new(behavior),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    /// Frames decoded as client messages.
    pub(crate) fn messages(&self) -> Vec<ServerMessage> {
        self.frames
            .lock()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionHandle for RecordingHandle {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, frame: Frame) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        let behavior = *self.behavior.lock();
        match behavior {
            Behavior::Accept => {
                self.frames.lock().push(frame);
                Ok(())
            }
            Behavior::Fail => Err(SendError::Closed),
            Behavior::Stall => std::future::pending().await,
        }
    }

    fn close(&self) {
        let _ = self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Snapshot source backed by a mutable scoreboard.
#[derive(Default)]
pub(crate) struct BoardSource {
    pub(crate) board: Mutex<livescore_core::Scoreboard>,
}

impl super::handle::SnapshotSource for BoardSource {
    fn snapshot(&self) -> livescore_core::InitialState {
        self.board.lock().snapshot()
    }
}
