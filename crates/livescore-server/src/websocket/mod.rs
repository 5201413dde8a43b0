//! WebSocket connection layer.
//!
//! Each accepted socket becomes a [`ClientConnection`] (the hub's handle) plus
//! three tasks: the session reader, the writer and the heartbeat monitor.

pub mod connection;
pub mod heartbeat;
pub mod session;

pub use connection::ClientConnection;
pub use session::{SessionConfig, run_ws_session};
