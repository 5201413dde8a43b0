//! Shutdown: one root token observed by the HTTP server, the feed, the
//! simulator and every connection session.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long tasks get to wind down when no timeout is given.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to the tasks handed to [`ShutdownCoordinator::graceful_shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks that finished before the deadline.
    pub finished: usize,
    /// Tasks aborted at the deadline.
    pub aborted: usize,
}

/// Owner of the root cancellation token.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh root token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The root token. Sessions take child tokens from it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the root token. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel, then wait for `handles` until a shared deadline; abort the rest.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> DrainReport {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        let deadline = Instant::now() + timeout;

        self.shutdown();
        info!(tasks = handles.len(), ?timeout, "draining tasks");

        let mut report = DrainReport::default();
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_ok() {
                report.finished += 1;
            } else {
                handle.abort();
                report.aborted += 1;
            }
        }

        if report.aborted > 0 {
            warn!(aborted = report.aborted, "tasks still running at drain deadline were aborted");
        }
        info!(finished = report.finished, "shutdown complete");
        report
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
