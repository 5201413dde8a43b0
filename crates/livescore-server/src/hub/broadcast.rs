//! Registration, initial-state push and fan-out of events to every client.
//!
//! Publishing is split into three steps: snapshot the registry, [`deliver`]
//! the frame to every handle concurrently, then [`evict`] each handle whose
//! send failed. A publish lock totally orders `publish` calls and
//! `on_connect`, so a client sees its initial state before any broadcast and
//! sees broadcasts in publish order.
//!
//! [`deliver`]: BroadcastHub::deliver
//! [`evict`]: BroadcastHub::evict

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use livescore_core::{ConnectionId, Event, InitialState};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::handle::{ConnectionHandle, Frame, SendError, SnapshotSource};
use super::registry::ClientRegistry;
use crate::metrics::{HUB_EVICTIONS_TOTAL, HUB_PUBLISH_TOTAL};

/// A value the hub can fan out.
pub trait Broadcast: Serialize + Sync {
    /// Wire name of the event kind, for logs and metrics.
    fn kind(&self) -> &'static str;
}

impl Broadcast for Event {
    fn kind(&self) -> &'static str {
        Event::kind(self)
    }
}

/// Hub failures reported to the caller.
#[derive(Debug, Error)]
pub enum HubError {
    /// The event could not be encoded; nothing was sent.
    #[error("failed to serialize {kind} event: {source}")]
    Serialization {
        /// Event kind.
        kind: &'static str,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The new connection could not take its initial state and was evicted.
    #[error("initial state delivery to {conn_id} failed: {source}")]
    InitialStateDelivery {
        /// The evicted connection.
        conn_id: ConnectionId,
        /// Why the send failed.
        #[source]
        source: SendError,
    },
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handles in the registry snapshot.
    pub recipients: usize,
    /// Handles that accepted the frame.
    pub delivered: usize,
    /// Handles evicted because their send failed.
    pub evicted: usize,
}

/// Owns the client registry and fans events out to it.
pub struct BroadcastHub {
    registry: ClientRegistry,
    publish_lock: Mutex<()>,
    snapshots: Arc<dyn SnapshotSource>,
    send_timeout: Duration,
}

impl BroadcastHub {
    /// Create a hub reading initial state from `snapshots`. Every send is
    /// bounded by `send_timeout`.
    pub fn new(snapshots: Arc<dyn SnapshotSource>, send_timeout: Duration) -> Self {
        Self {
            registry: ClientRegistry::new(),
            publish_lock: Mutex::new(()),
            snapshots,
            send_timeout,
        }
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether a connection is registered.
    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// Register a new connection and push the current snapshot to it alone.
    ///
    /// Runs under the publish lock, so no broadcast can reach the handle
    /// before its initial state. If that first send fails the handle is
    /// evicted and [`HubError::InitialStateDelivery`] is returned.
    pub async fn on_connect(
        &self,
        handle: Arc<dyn ConnectionHandle>,
    ) -> Result<InitialState, HubError> {
        let _guard = self.publish_lock.lock().await;

        let state = self.snapshots.snapshot();
        let frame: Frame = state
            .encode()
            .map_err(|source| HubError::Serialization {
                kind: "initialGames",
                source,
            })?
            .into();

        if !self.registry.add(Arc::clone(&handle)) {
            debug!(conn_id = %handle.id(), "connection already registered");
        }

        match self.send_bounded(handle.as_ref(), frame).await {
            Ok(()) => {
                debug!(conn_id = %handle.id(), games = state.games.len(), "initial state sent");
                Ok(state)
            }
            Err(source) => {
                self.evict(handle.as_ref(), source);
                Err(HubError::InitialStateDelivery {
                    conn_id: handle.id().clone(),
                    source,
                })
            }
        }
    }

    /// Unregister and close a connection. Safe to call repeatedly.
    pub fn on_disconnect(&self, handle: &dyn ConnectionHandle) {
        if self.registry.remove(handle.id()) {
            debug!(conn_id = %handle.id(), "connection unregistered");
        }
        handle.close();
    }

    /// Serialize `event` once and send it to every registered connection.
    pub async fn publish<E: Broadcast>(&self, event: &E) -> Result<PublishReport, HubError> {
        self.publish_with_commit(event, || ()).await
    }

    /// Like [`publish`](Self::publish), running `commit` under the publish
    /// lock before fan-out.
    ///
    /// A producer that makes its state change visible to
    /// [`SnapshotSource`] inside `commit` guarantees every connection sees
    /// either the old snapshot followed by this event, or the new snapshot
    /// and not this event. `commit` is not run if serialization fails.
    pub async fn publish_with_commit<E, F>(
        &self,
        event: &E,
        commit: F,
    ) -> Result<PublishReport, HubError>
    where
        E: Broadcast,
        F: FnOnce() + Send,
    {
        let kind = event.kind();
        let frame: Frame = serde_json::to_string(event)
            .map_err(|source| HubError::Serialization { kind, source })?
            .into();

        let _guard = self.publish_lock.lock().await;
        commit();

        let recipients = self.registry.snapshot();
        let failures = self.deliver(&recipients, &frame).await;
        let evicted = failures.len();
        for (handle, reason) in failures {
            self.evict(handle.as_ref(), reason);
        }

        counter!(HUB_PUBLISH_TOTAL, "kind" => kind).increment(1);
        let report = PublishReport {
            recipients: recipients.len(),
            delivered: recipients.len() - evicted,
            evicted,
        };
        debug!(
            kind,
            recipients = report.recipients,
            evicted = report.evicted,
            "event published"
        );
        Ok(report)
    }

    /// Send `frame` to every handle concurrently; return the ones that failed.
    pub async fn deliver(
        &self,
        recipients: &[Arc<dyn ConnectionHandle>],
        frame: &Frame,
    ) -> Vec<(Arc<dyn ConnectionHandle>, SendError)> {
        let sends = recipients.iter().map(|handle| {
            let frame = Arc::clone(frame);
            async move {
                self.send_bounded(handle.as_ref(), frame)
                    .await
                    .err()
                    .map(|reason| (Arc::clone(handle), reason))
            }
        });
        join_all(sends).await.into_iter().flatten().collect()
    }

    /// Remove a failed handle from the registry and close it.
    pub fn evict(&self, handle: &dyn ConnectionHandle, reason: SendError) {
        let removed = self.registry.remove(handle.id());
        handle.close();
        if removed {
            counter!(HUB_EVICTIONS_TOTAL).increment(1);
            warn!(conn_id = %handle.id(), error = %reason, "evicting client after failed send");
        }
    }

    async fn send_bounded(
        &self,
        handle: &dyn ConnectionHandle,
        frame: Frame,
    ) -> Result<(), SendError> {
        match tokio::time::timeout(self.send_timeout, handle.send(frame)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::TimedOut),
        }
    }
}
