//! # livescore-server
//!
//! Axum HTTP + `WebSocket` server and the fan-out broadcast hub.
//!
//! - [`hub`]: connection handle abstraction, client registry, broadcast hub
//! - [`websocket`]: per-connection session, outbound queue, heartbeat
//! - [`feed`]: single-owner scoreboard task and the match simulator
//! - HTTP endpoints: `/ws`, `/events`, `/games`, `/health`, `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod feed;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::ScoreboardServer;
