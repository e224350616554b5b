//! WebSocket producer: connect, stream readings, reconnect.
//!
//! Architecture:
//! - [`Producer::run`] is an outer reconnect loop governed by a
//!   [`RetryPolicy`](crate::domain::RetryPolicy).
//! - Each successful connection runs one session: an optional announcement,
//!   then one reading per `send_interval` tick, while inbound messages from
//!   the relay are logged.
//! - The [`SensorState`] survives reconnects, so uptime keeps counting.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::domain::{ConnectionAnnouncement, PayloadMode, SensorState, SimulatorConfig};

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How often a backoff sleep wakes up to check the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Errors that can occur in the producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The WebSocket handshake with the relay failed.
    #[error("failed to connect to relay at {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: WsError,
    },
    /// An established connection failed while reading or writing.
    #[error("connection error: {0}")]
    WebSocket(#[from] WsError),
    /// A reading could not be encoded.
    #[error("failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),
    /// The retry policy ran out of attempts.
    #[error("gave up after {attempts} consecutive failed connection attempt(s)")]
    RetriesExhausted { attempts: u32 },
}

/// Drives one simulated device against one relay.
pub struct Producer {
    config: SimulatorConfig,
    sensor: SensorState,
    rng: StdRng,
}

impl Producer {
    /// Creates a producer seeded from the OS random source.
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates a producer with an explicit random source.
    pub fn with_rng(config: SimulatorConfig, rng: StdRng) -> Self {
        Self {
            config,
            sensor: SensorState::default(),
            rng,
        }
    }

    pub fn sensor(&self) -> &SensorState {
        &self.sensor
    }

    /// Connects and streams readings until `running` is set to `false`.
    ///
    /// A lost connection is retried after `retry.delay_for(0)`; a refused one
    /// backs off exponentially.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::RetriesExhausted`] once the policy's
    /// `max_attempts` consecutive connection attempts have failed.
    pub async fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), ProducerError> {
        let retry = self.config.retry;
        let mut failures: u32 = 0;

        while running.load(Ordering::Relaxed) {
            match self.connect().await {
                Ok(ws) => {
                    failures = 0;
                    info!("connected to relay at {}", self.config.relay_url);

                    match self.run_session(ws, &running).await {
                        Ok(()) => info!("disconnected from relay"),
                        Err(e) => warn!("session ended: {e}"),
                    }
                }
                Err(e) => {
                    warn!("{e}");
                    failures = failures.saturating_add(1);
                    if !retry.allows_retry(failures) {
                        return Err(ProducerError::RetriesExhausted { attempts: failures });
                    }
                }
            }

            if !running.load(Ordering::Relaxed) {
                break;
            }
            let delay = retry.delay_for(failures.saturating_sub(1));
            info!("reconnecting in {delay:?}");
            sleep_while_running(delay, &running).await;
        }

        info!("producer stopped");
        Ok(())
    }

    async fn connect(&self) -> Result<RelayStream, ProducerError> {
        let (ws, _response) = connect_async(self.config.relay_url.as_str())
            .await
            .map_err(|source| ProducerError::ConnectFailed {
                url: self.config.relay_url.clone(),
                source,
            })?;
        Ok(ws)
    }

    /// Runs one connected session.  Returns `Ok` on an orderly close from
    /// either side, `Err` if the socket fails.
    async fn run_session(
        &mut self,
        ws: RelayStream,
        running: &AtomicBool,
    ) -> Result<(), ProducerError> {
        let (mut ws_tx, mut ws_rx) = ws.split();

        if self.config.mode == PayloadMode::Json {
            let announcement = ConnectionAnnouncement::new(now_millis());
            ws_tx
                .send(WsMessage::Text(serde_json::to_string(&announcement)?))
                .await?;
        }

        // First reading goes out one interval after connecting.
        let mut ticker = time::interval_at(
            Instant::now() + self.config.send_interval,
            self.config.send_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_poll = time::interval(SHUTDOWN_POLL);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let payload = self.next_payload()?;
                    debug!("sending {payload}");
                    ws_tx.send(WsMessage::Text(payload)).await?;
                }
                _ = shutdown_poll.tick() => {
                    if !running.load(Ordering::Relaxed) {
                        let _ = ws_tx.close().await;
                        return Ok(());
                    }
                }
                frame = ws_rx.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => info!("message from relay: {text}"),
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        info!("message from relay: {}", String::from_utf8_lossy(&bytes));
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(WsError::ConnectionClosed)) => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }

    /// Advances the sensor and renders the payload for the configured mode.
    fn next_payload(&mut self) -> Result<String, ProducerError> {
        self.sensor.step(&mut self.rng);
        match self.config.mode {
            PayloadMode::Numeric => Ok(self.sensor.numeric_payload()),
            PayloadMode::Json => {
                let reading = self.sensor.reading(&mut self.rng, now_millis());
                Ok(serde_json::to_string(&reading)?)
            }
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn sleep_while_running(delay: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        time::sleep((deadline - now).min(SHUTDOWN_POLL)).await;
    }
}
