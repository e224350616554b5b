//! Simulator configuration.

use std::time::Duration;

use super::retry::RetryPolicy;

/// Relay address used when none is supplied.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:8080";

/// Interval between readings when none is supplied.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// What each reading looks like on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// A JSON document per reading, preceded by a connection announcement.
    /// The relay classifies the connection as a JSON client.
    #[default]
    Json,
    /// The bare `sensorValue` as a decimal literal.  The relay classifies the
    /// connection as a numeric client and wraps each value in an envelope.
    Numeric,
}

/// Complete simulator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// WebSocket URL of the relay, e.g. `ws://localhost:8080`.
    pub relay_url: String,
    /// How often a reading is sent.
    pub send_interval: Duration,
    pub mode: PayloadMode,
    pub retry: RetryPolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            send_interval: DEFAULT_SEND_INTERVAL,
            mode: PayloadMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}
