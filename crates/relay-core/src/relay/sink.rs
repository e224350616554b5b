//! The outbound half of a peer, as seen by the broadcast hub.
//!
//! The hub must never wait on a slow peer, so delivery is a synchronous,
//! non-blocking *enqueue*.  The real implementation is a bounded Tokio channel
//! whose receiver is drained by the connection's WebSocket writer task.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Why a single peer did not accept a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The peer's outbound queue is at capacity (slow or hung reader).
    #[error("outbound queue full")]
    QueueFull,
    /// The peer's writer has gone away (connection mid-close).
    #[error("peer connection closed")]
    Closed,
}

/// Something a broadcast can be handed to without blocking.
#[cfg_attr(test, mockall::automock)]
pub trait PeerSink: Send + Sync {
    /// Enqueues `payload` for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the payload could not be queued.  The
    /// caller treats this as a per-peer failure and moves on.
    fn try_deliver(&self, payload: &str) -> Result<(), DeliveryError>;
}

impl PeerSink for mpsc::Sender<String> {
    fn try_deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        self.try_send(payload.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
