//! sensor-simulator: pretends to be an Arduino board feeding the relay.
//!
//! # Usage
//!
//! ```text
//! sensor-simulator [OPTIONS]
//!
//! Options:
//!   --url              <URL>   Relay WebSocket URL          [default: ws://localhost:8080]
//!   --interval-ms      <MS>    Time between readings        [default: 1000]
//!   --mode             <MODE>  json | numeric               [default: json]
//!   --initial-delay-ms <MS>    First reconnect delay        [default: 5000]
//!   --max-delay-ms     <MS>    Reconnect delay ceiling      [default: 60000]
//!   --max-attempts     <N>     Give up after N failures     [default: unbounded]
//! ```
//!
//! Every option can also be set through the matching `SIMULATOR_*`
//! environment variable (`SIMULATOR_URL`, `SIMULATOR_INTERVAL_MS`, ...).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relay_simulator::domain::{PayloadMode, RetryPolicy, SimulatorConfig};
use relay_simulator::infrastructure::Producer;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Announcement, then one JSON reading per tick.
    Json,
    /// Bare sensor value per tick.
    Numeric,
}

impl From<ModeArg> for PayloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Json => PayloadMode::Json,
            ModeArg::Numeric => PayloadMode::Numeric,
        }
    }
}

/// Simulated sensor board for the WebSocket relay.
#[derive(Debug, Parser)]
#[command(name = "sensor-simulator", version)]
struct Cli {
    /// WebSocket URL of the relay.
    #[arg(long, default_value = "ws://localhost:8080", env = "SIMULATOR_URL")]
    url: String,

    /// Milliseconds between readings.
    #[arg(
        long,
        default_value_t = 1000,
        env = "SIMULATOR_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_ms: u64,

    /// Payload format sent on every tick.
    #[arg(long, value_enum, default_value_t = ModeArg::Json, env = "SIMULATOR_MODE")]
    mode: ModeArg,

    /// Delay before the first reconnect attempt.
    #[arg(long, default_value_t = 5000, env = "SIMULATOR_INITIAL_DELAY_MS")]
    initial_delay_ms: u64,

    /// Ceiling for the exponential reconnect delay.
    #[arg(long, default_value_t = 60_000, env = "SIMULATOR_MAX_DELAY_MS")]
    max_delay_ms: u64,

    /// Consecutive failed connection attempts before exiting.  Omit to retry
    /// forever.
    #[arg(long, env = "SIMULATOR_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,
}

impl Cli {
    fn into_simulator_config(self) -> SimulatorConfig {
        SimulatorConfig {
            relay_url: self.url,
            send_interval: Duration::from_millis(self.interval_ms),
            mode: self.mode.into(),
            retry: RetryPolicy {
                initial_delay: Duration::from_millis(self.initial_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                max_attempts: self.max_attempts,
            },
        }
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

    let config = Cli::parse().into_simulator_config();
    info!(
        "sensor simulator starting: url={}, interval={:?}, mode={:?}",
        config.relay_url, config.send_interval, config.mode
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    Producer::new(config).run(running).await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::parse_from(["sensor-simulator"]).into_simulator_config();

        assert_eq!(config.relay_url, "ws://localhost:8080");
        assert_eq!(config.send_interval, Duration::from_secs(1));
        assert_eq!(config.mode, PayloadMode::Json);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_cli_numeric_mode_and_bounded_retries() {
        let cli = Cli::parse_from([
            "sensor-simulator",
            "--url",
            "ws://10.0.0.5:9000",
            "--mode",
            "numeric",
            "--interval-ms",
            "250",
            "--max-attempts",
            "3",
        ]);

        let config = cli.into_simulator_config();

        assert_eq!(config.relay_url, "ws://10.0.0.5:9000");
        assert_eq!(config.mode, PayloadMode::Numeric);
        assert_eq!(config.send_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, Some(3));
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["sensor-simulator", "--mode", "xml"]).is_err());
    }

    #[test]
    fn test_cli_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["sensor-simulator", "--interval-ms", "0"]).is_err());
    }
}
