//! WebSocket server: accept loop and per-connection session management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Registering the session with the [`RelayService`], backed by a bounded
//!    outbound queue.
//! 5. Running two halves concurrently per session:
//!    - **Reader**: feeds every inbound frame through the relay pipeline, one
//!      at a time.
//!    - **Writer**: drains the outbound queue into the socket, bounding each
//!      write with `send_timeout`.
//! 6. Removing the session from the registry exactly once when either half
//!    finishes.
//! 7. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Why a queue per connection?
//!
//! The broadcast hub only ever *enqueues* (`try_send`).  A slow dashboard
//! fills its own queue and starts losing messages; it never slows down the
//! producer that triggered the broadcast, or any other peer.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, warn};

use relay_core::{ConnectionId, RawMessage};

use crate::application::RelayService;
use crate::domain::RelayConfig;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).  Per-connection failures are logged, never returned.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("WebSocket relay listening on ws://{}", config.bind_addr);

    serve(listener, config, RelayService::new(), running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Split out from [`run_server`] so tests can bind port 0 and learn the real
/// address before the loop starts.
pub async fn serve(
    listener: TcpListener,
    config: RelayConfig,
    service: RelayService,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let svc = service.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg, svc).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. too many open files); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<RelayConfig>,
    service: RelayService,
) {
    match run_session(raw_stream, peer_addr, &config, &service).await {
        Ok(()) => debug!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one WebSocket connection.
///
/// # Errors
///
/// Returns an error if the handshake fails, if the connection cannot be
/// registered, or if either half ends on a transport error.  The registry
/// entry is removed in every case where it was created.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: &RelayConfig,
    service: &RelayService,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut ws_tx, ws_rx) = ws_stream.split();

    // The registry holds the only sender.  Removing the entry drops it, which
    // ends the writer below.
    let (out_tx, out_rx) = mpsc::channel::<String>(config.queue_capacity.max(1));
    let id = service.open(peer_addr, Arc::new(out_tx)).await?;

    let outcome = tokio::select! {
        r = read_inbound(ws_rx, service, id) => r,
        r = write_outbound(&mut ws_tx, out_rx, config.send_timeout, id) => r,
    };

    service.close(id).await;

    // Best effort: completes our half of the close handshake, or tells a
    // peer we gave up on that we are going away.
    let _ = timeout(config.send_timeout, ws_tx.close()).await;

    outcome
}

/// Reads frames until the peer closes or the stream fails.
///
/// Each text or binary frame is awaited through the full pipeline before the
/// next one is read, which keeps one connection's messages in order.
async fn read_inbound(
    mut ws_rx: WsSource,
    service: &RelayService,
    id: ConnectionId,
) -> anyhow::Result<()> {
    while let Some(frame) = ws_rx.next().await {
        let raw = match frame {
            Ok(WsMessage::Text(text)) => RawMessage::new(id, text),
            Ok(WsMessage::Binary(bytes)) => RawMessage::from_bytes(id, &bytes),
            Ok(WsMessage::Ping(data)) => {
                debug!("connection {id}: ping ({} bytes)", data.len());
                continue;
            }
            Ok(WsMessage::Pong(_)) => continue,
            Ok(WsMessage::Close(frame)) => {
                debug!("connection {id}: close frame received: {frame:?}");
                service.begin_close(id).await;
                return Ok(());
            }
            Ok(WsMessage::Frame(_)) => continue,
            Err(WsError::ConnectionClosed) => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("connection {id}: read failed"));
            }
        };

        if let Err(e) = service.handle_message(raw).await {
            // The registry no longer knows this connection; nothing to relay.
            return Err(e).with_context(|| format!("connection {id}: message not relayed"));
        }
    }

    debug!("connection {id}: stream ended");
    Ok(())
}

/// Drains the outbound queue into the socket.
///
/// Returns `Ok(())` once the queue's sender is gone (the connection was
/// unregistered).
async fn write_outbound(
    ws_tx: &mut WsSink,
    mut out_rx: mpsc::Receiver<String>,
    send_timeout: Duration,
    id: ConnectionId,
) -> anyhow::Result<()> {
    while let Some(payload) = out_rx.recv().await {
        match timeout(send_timeout, ws_tx.send(WsMessage::Text(payload))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(e).with_context(|| format!("connection {id}: write failed"));
            }
            Err(_) => {
                anyhow::bail!("connection {id}: write timed out after {send_timeout:?}");
            }
        }
    }
    Ok(())
}
