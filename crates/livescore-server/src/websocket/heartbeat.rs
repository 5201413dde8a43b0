//! Pong-based liveness for a connection.
//!
//! The writer task pings every `interval`; this monitor checks on the same
//! period whether anything arrived since its last look and closes silent
//! clients after `timeout`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stayed silent for the whole timeout window.
    TimedOut,
    /// The connection closed (or the server shut down) first.
    Cancelled,
}

/// Counts consecutive silent checks against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissedPongs {
    missed: u32,
    limit: u32,
}

impl MissedPongs {
    /// Limit is `timeout / interval`, never below 1.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let limit = (timeout.as_millis() / interval_ms).max(1);
        Self {
            missed: 0,
            limit: u32::try_from(limit).unwrap_or(u32::MAX),
        }
    }

    /// Consecutive misses allowed before the client is dropped.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record one check. Returns `true` once the limit is reached.
    pub fn record(&mut self, heard_from: bool) -> bool {
        if heard_from {
            self.missed = 0;
            return false;
        }
        self.missed = self.missed.saturating_add(1);
        self.missed >= self.limit
    }
}

/// Watch `connection` until it goes silent for `timeout` or `cancel` fires.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval(interval);
    let _ = ticker.tick().await;
    let mut missed = MissedPongs::new(interval, timeout);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
            _ = ticker.tick() => {
                if missed.record(connection.check_alive()) {
                    return HeartbeatResult::TimedOut;
                }
            }
        }
    }
}
