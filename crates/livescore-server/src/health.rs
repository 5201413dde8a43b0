//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

/// Overall server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Accepting connections and events.
    Ok,
    /// Shutdown started; connections are being closed.
    Draining,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `draining` once shutdown has started.
    pub status: HealthStatus,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered WebSocket clients.
    pub connections: usize,
    /// Games on the scoreboard.
    pub games: usize,
}

/// Snapshot of the live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    games: usize,
    draining: bool,
) -> HealthResponse {
    HealthResponse {
        status: if draining {
            HealthStatus::Draining
        } else {
            HealthStatus::Ok
        },
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        games,
    }
}
