//! Fan-out broadcast hub.
//!
//! The hub owns the registry of live connections and is the only place that
//! adds, removes or iterates it. It runs no task of its own: `on_connect`,
//! `on_disconnect` and `publish` execute on the caller's task.

pub mod broadcast;
pub mod handle;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{Broadcast, BroadcastHub, HubError, PublishReport};
pub use handle::{ConnectionHandle, Frame, SendError, SnapshotSource};
pub use registry::ClientRegistry;
