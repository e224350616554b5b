//! Integration tests for the producer against a throwaway WebSocket server.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use relay_core::{classify, Category};
use relay_simulator::domain::{PayloadMode, RetryPolicy, SimulatorConfig};
use relay_simulator::infrastructure::{Producer, ProducerError};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fast_config(url: String, mode: PayloadMode, max_attempts: Option<u32>) -> SimulatorConfig {
    SimulatorConfig {
        relay_url: url,
        send_interval: Duration::from_millis(20),
        mode,
        retry: RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            max_attempts,
        },
    }
}

fn spawn_producer(
    config: SimulatorConfig,
) -> (
    Arc<AtomicBool>,
    tokio::task::JoinHandle<Result<(), ProducerError>>,
) {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let handle = tokio::spawn(async move {
        let mut producer = Producer::with_rng(config, StdRng::seed_from_u64(3));
        producer.run(flag).await
    });
    (running, handle)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = assert_ok!(timeout(RECV_TIMEOUT, listener.accept()).await.unwrap());
    assert_ok!(accept_async(stream).await)
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for the producer")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return text;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_json_mode_announces_then_streams_readings() {
    // Arrange
    let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
    let url = format!("ws://{}", assert_ok!(listener.local_addr()));
    let (running, handle) = spawn_producer(fast_config(url, PayloadMode::Json, None));

    // Act
    let mut ws = accept(&listener).await;
    let announcement: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    let reading: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();

    // Assert
    assert_eq!(announcement["status"], "connected");
    assert_eq!(announcement["device"], "Arduino");
    assert_eq!(reading["uptime"], 1);
    assert!(reading.get("sensorValue").is_some());
    assert!(reading.get("wifiRSSI").is_some());

    running.store(false, Ordering::Relaxed);
    let result = timeout(RECV_TIMEOUT, handle).await.unwrap().unwrap();
    assert_ok!(result);
}

#[tokio::test]
async fn test_numeric_mode_sends_values_the_relay_treats_as_numeric() {
    let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
    let url = format!("ws://{}", assert_ok!(listener.local_addr()));
    let (running, _handle) = spawn_producer(fast_config(url, PayloadMode::Numeric, None));

    let mut ws = accept(&listener).await;
    let first = next_text(&mut ws).await;

    // No announcement: the very first message must classify as numeric.
    assert_eq!(classify(&first), Category::NumericClient);
    let value: i32 = first.parse().unwrap();
    assert!((0..=1023).contains(&value));

    running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_producer_reconnects_after_server_closes() {
    // Arrange
    let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
    let url = format!("ws://{}", assert_ok!(listener.local_addr()));
    let (running, _handle) = spawn_producer(fast_config(url, PayloadMode::Json, None));

    // Act: first session is closed by the server right after the announcement
    let mut first = accept(&listener).await;
    next_text(&mut first).await;
    assert_ok!(first.close(None).await);

    // Assert: a second session opens and announces again
    let mut second = accept(&listener).await;
    let announcement: serde_json::Value = serde_json::from_str(&next_text(&mut second).await).unwrap();
    assert_eq!(announcement["status"], "connected");

    running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_bounded_retries_give_up_when_relay_is_unreachable() {
    // Arrange: grab a free port, then release it so connections are refused
    let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
    let url = format!("ws://{}", assert_ok!(listener.local_addr()));
    drop(listener);

    // Act
    let (_running, handle) = spawn_producer(fast_config(url, PayloadMode::Json, Some(3)));
    let result = timeout(RECV_TIMEOUT, handle).await.unwrap().unwrap();

    // Assert
    let err = assert_err!(result);
    assert!(matches!(err, ProducerError::RetriesExhausted { attempts: 3 }));
}
