//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for runtime settings.  It is
//! populated from CLI arguments (see `main.rs`) or from defaults in tests.
//!
//! No environment reads happen here; integration tests build a config
//! directly and bind an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

/// Default WebSocket listener port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default outbound queue depth per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Default per-write timeout towards a single peer.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use relay_server::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The address and port the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// How many broadcast payloads may wait in one peer's outbound queue.
    ///
    /// Once full, further broadcasts to that peer are dropped (and logged)
    /// instead of stalling the sender.  Must be at least 1.
    pub queue_capacity: usize,

    /// Maximum time a single WebSocket write to a peer may take.
    ///
    /// A peer that cannot absorb a frame within this window is considered
    /// hung and its connection is closed.
    pub send_timeout: Duration,
}

impl Default for RelayConfig {
    /// | Field          | Default        |
    /// |----------------|----------------|
    /// | bind_addr      | `0.0.0.0:8080` |
    /// | queue_capacity | 128            |
    /// | send_timeout   | 5 seconds      |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
