//! RelayService: the connection lifecycle and per-message pipeline.
//!
//! One `RelayService` is shared (via `Arc`) by every session task.  A session
//! calls into it at three points:
//!
//! ```text
//! handshake done ──► open(peer_addr, sink)     → ConnectionId
//! each message   ──► handle_message(raw)       → BroadcastReport
//! close / error  ──► begin_close(id), close(id)
//! ```
//!
//! `handle_message` is awaited by the session before it reads the next frame,
//! so messages from one connection are classified, normalized, and broadcast
//! strictly in arrival order.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use relay_core::{
    normalize, BroadcastHub, BroadcastReport, ConnectionId, ConnectionRecord,
    ConnectionRegistry, PeerSink, RawMessage, RegistryError,
};

/// Errors surfaced to the session task.
///
/// None of these stop the relay: the session logs them and either skips the
/// message or ends its own connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Shared relay state plus the classify → normalize → broadcast pipeline.
#[derive(Clone)]
pub struct RelayService {
    hub: BroadcastHub,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    /// Creates a service with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()))
    }

    /// Creates a service over an existing registry.
    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            hub: BroadcastHub::new(registry),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.hub.registry()
    }

    /// Registers a connection whose WebSocket handshake has completed.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`]; in practice only reachable through an
    /// identity collision.
    pub async fn open(
        &self,
        peer_addr: SocketAddr,
        sink: Arc<dyn PeerSink>,
    ) -> Result<ConnectionId, RelayError> {
        let id = self
            .registry()
            .add(ConnectionRecord::new(Some(peer_addr)), sink)
            .await?;
        info!("client connected: {id} from {peer_addr}");
        Ok(id)
    }

    /// Runs one inbound message through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownConnection`] (wrapped) if the origin is
    /// no longer registered; the message is dropped in that case.
    pub async fn handle_message(&self, raw: RawMessage) -> Result<BroadcastReport, RelayError> {
        let origin = raw.origin();
        debug!("connection {origin}: received {}", raw.payload());

        let category = self.registry().classify_once(origin, raw.payload()).await?;
        let normalized = normalize(category, &raw);
        Ok(self.hub.broadcast(origin, &normalized).await)
    }

    /// Records that a close handshake has started on `id`.
    pub async fn begin_close(&self, id: ConnectionId) -> bool {
        self.registry().begin_close(id).await
    }

    /// Removes `id` from the registry.  Safe to call more than once.
    ///
    /// Returns `true` if this call performed the removal.
    pub async fn close(&self, id: ConnectionId) -> bool {
        match self.registry().remove(id).await {
            Some(record) => {
                info!(
                    "client disconnected: {id} (type: {})",
                    record.category()
                );
                true
            }
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.registry().len().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
