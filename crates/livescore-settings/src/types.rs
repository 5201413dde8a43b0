//! Settings types. Every field has a default so partial files are valid.

use livescore_logging::LoggingConfig;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivescoreSettings {
    /// Network and connection settings.
    pub server: ServerSettings,
    /// Built-in match simulator.
    pub simulator: SimulatorSettings,
    /// Log output.
    pub logging: LoggingConfig,
}

impl LivescoreSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.host.trim().is_empty() {
            return Err(invalid("server.host must not be empty"));
        }
        if s.max_connections == 0 {
            return Err(invalid("server.maxConnections must be > 0"));
        }
        if s.send_queue_capacity == 0 {
            return Err(invalid("server.sendQueueCapacity must be > 0"));
        }
        if s.send_timeout_ms == 0 {
            return Err(invalid("server.sendTimeoutMs must be > 0"));
        }
        if s.heartbeat_interval_ms == 0 || s.heartbeat_timeout_ms < s.heartbeat_interval_ms {
            return Err(invalid(
                "server.heartbeatTimeoutMs must be >= server.heartbeatIntervalMs > 0",
            ));
        }
        if self.simulator.tick_interval_ms == 0 {
            return Err(invalid("simulator.tickIntervalMs must be > 0"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> SettingsError {
    SettingsError::InvalidValue(msg.to_string())
}

/// Network and connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (`0` picks a free port).
    pub port: u16,
    /// Upgrades beyond this many live connections are refused.
    pub max_connections: usize,
    /// Per-connection outbound queue depth, in frames.
    pub send_queue_capacity: usize,
    /// Longest a single send may wait on a full queue before eviction.
    pub send_timeout_ms: u64,
    /// Interval between WebSocket pings.
    pub heartbeat_interval_ms: u64,
    /// Silence after which a connection is considered dead.
    pub heartbeat_timeout_ms: u64,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 1024,
            send_queue_capacity: 256,
            send_timeout_ms: 2_000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 64 * 1024,
        }
    }
}

/// Built-in match simulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorSettings {
    /// Run the simulator and start from the seeded fixtures.
    pub enabled: bool,
    /// Time between simulator ticks.
    pub tick_interval_ms: u64,
    /// Home goals after which an active game is finished.
    pub max_home_goals: u32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 5_000,
            max_home_goals: 3,
        }
    }
}
