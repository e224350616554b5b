//! sensor-relay: entry point.
//!
//! Accepts WebSocket connections from sensor producers and dashboards,
//! classifies each connection by its first message, and rebroadcasts every
//! message to all other connected peers.  Bare numeric readings are wrapped
//! in a `{"value","timestamp","source"}` envelope on the way through.
//!
//! # Usage
//!
//! ```text
//! sensor-relay [OPTIONS]
//!
//! Options:
//!   --bind            <ADDR>  Listener IP address       [default: 0.0.0.0]
//!   --port            <PORT>  Listener port             [default: 8080]
//!   --queue-capacity  <N>     Outbound queue per peer   [default: 128]
//!   --send-timeout-ms <MS>    Per-write timeout to peer [default: 5000]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Default   |
//! |-------------------------|-----------|
//! | `RELAY_BIND`            | `0.0.0.0` |
//! | `RELAY_PORT`            | `8080`    |
//! | `RELAY_QUEUE_CAPACITY`  | `128`     |
//! | `RELAY_SEND_TIMEOUT_MS` | `5000`    |
//!
//! CLI args take precedence.  Log verbosity follows `RUST_LOG`
//! (e.g. `RUST_LOG=debug` to see every relayed message).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::domain::RelayConfig;
use relay_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time WebSocket relay for sensor readings.
#[derive(Debug, Parser)]
#[command(
    name = "sensor-relay",
    about = "WebSocket relay that classifies sensor producers and rebroadcasts their readings",
    version
)]
struct Cli {
    /// IP address to bind the listener to.
    ///
    /// `0.0.0.0` accepts connections on every interface; `127.0.0.1` keeps
    /// the relay local.
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_BIND")]
    bind: String,

    /// TCP port for the WebSocket listener.
    #[arg(long, default_value_t = 8080, env = "RELAY_PORT")]
    port: u16,

    /// Number of broadcast payloads that may wait for one slow peer before
    /// further payloads to it are dropped.
    #[arg(
        long,
        default_value_t = 128,
        env = "RELAY_QUEUE_CAPACITY",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    queue_capacity: u32,

    /// Maximum milliseconds a single write to a peer may take before that
    /// peer is disconnected.
    #[arg(long, default_value_t = 5000, env = "RELAY_SEND_TIMEOUT_MS")]
    send_timeout_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(RelayConfig {
            bind_addr,
            queue_capacity: self.queue_capacity as usize,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "sensor relay starting: bind={}, queue_capacity={}, send_timeout={:?}",
        config.bind_addr, config.queue_capacity, config.send_timeout
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("sensor relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
