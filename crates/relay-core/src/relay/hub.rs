//! BroadcastHub: fan-out of one normalized message to every other peer.
//!
//! # Snapshot, then send
//!
//! ```text
//! read lock ──► copy live set ──► unlock ──► for each peer ≠ origin: try_deliver
//! ```
//!
//! Delivery is fire-and-forget per peer.  A peer whose queue is full or whose
//! writer has gone away is logged and skipped; the remaining peers still get
//! the message and the sender never sees an error.  A peer that closes while
//! the loop runs may or may not receive the message, but the loop itself
//! cannot fail.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ConnectionId, NormalizedMessage};
use crate::relay::registry::ConnectionRegistry;

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers whose outbound queue accepted the message.
    pub delivered: usize,
    /// Peers that could not accept it.
    pub failed: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Broadcasts messages to the registry's live set.
#[derive(Clone)]
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Delivers `message` to every open connection except `origin`.
    pub async fn broadcast(
        &self,
        origin: ConnectionId,
        message: &NormalizedMessage,
    ) -> BroadcastReport {
        let peers = self.registry.live_set().await;
        let mut report = BroadcastReport::default();

        for peer in peers.iter().filter(|p| p.id != origin) {
            match peer.sink.try_deliver(message.payload()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("connection {}: broadcast from {origin} dropped: {e}", peer.id);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "connection {origin}: broadcast to {} peer(s), {} failed",
            report.delivered, report.failed
        );
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionRecord;
    use crate::relay::sink::{DeliveryError, MockPeerSink, PeerSink};
    use tokio::sync::mpsc;

    async fn add_channel_peer(
        registry: &ConnectionRegistry,
    ) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel::<String>(8);
        let id = registry
            .add(ConnectionRecord::new(None), Arc::new(tx))
            .await
            .unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_skips_origin_and_reaches_everyone_else() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx_a) = add_channel_peer(&registry).await;
        let (_b, mut rx_b) = add_channel_peer(&registry).await;
        let (_c, mut rx_c) = add_channel_peer(&registry).await;
        let hub = BroadcastHub::new(Arc::clone(&registry));

        // Act
        let report = hub.broadcast(a, &NormalizedMessage::verbatim("hi")).await;

        // Assert
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });
        assert_eq!(rx_b.try_recv().unwrap(), "hi");
        assert_eq!(rx_c.try_recv().unwrap(), "hi");
        assert!(rx_a.try_recv().is_err(), "origin must not receive its own echo");
    }

    #[tokio::test]
    async fn test_broadcast_with_no_other_peers_delivers_nothing() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx) = add_channel_peer(&registry).await;
        let hub = BroadcastHub::new(registry);

        let report = hub.broadcast(a, &NormalizedMessage::verbatim("x")).await;

        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test]
    async fn test_failing_peer_does_not_stop_delivery_to_others() {
        // Arrange: B always fails, C records deliveries
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx_a) = add_channel_peer(&registry).await;

        let mut failing = MockPeerSink::new();
        failing
            .expect_try_deliver()
            .times(1)
            .returning(|_| Err(DeliveryError::Closed));
        let failing: Arc<dyn PeerSink> = Arc::new(failing);
        registry
            .add(ConnectionRecord::new(None), failing)
            .await
            .unwrap();

        let (_c, mut rx_c) = add_channel_peer(&registry).await;
        let hub = BroadcastHub::new(Arc::clone(&registry));

        // Act
        let report = hub.broadcast(a, &NormalizedMessage::verbatim("reading")).await;

        // Assert
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(rx_c.try_recv().unwrap(), "reading");
    }

    #[tokio::test]
    async fn test_closing_peer_is_not_sent_to() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx_a) = add_channel_peer(&registry).await;

        let mut closing = MockPeerSink::new();
        closing.expect_try_deliver().never();
        let closing_id = registry
            .add(ConnectionRecord::new(None), Arc::new(closing))
            .await
            .unwrap();
        registry.begin_close(closing_id).await;

        let hub = BroadcastHub::new(Arc::clone(&registry));
        let report = hub.broadcast(a, &NormalizedMessage::verbatim("x")).await;

        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_counts_as_failure() {
        // Arrange: a peer with capacity 1 that never drains
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx_a) = add_channel_peer(&registry).await;
        let (tx, _rx_slow) = mpsc::channel::<String>(1);
        registry
            .add(ConnectionRecord::new(None), Arc::new(tx))
            .await
            .unwrap();
        let hub = BroadcastHub::new(Arc::clone(&registry));

        // Act
        let first = hub.broadcast(a, &NormalizedMessage::verbatim("1")).await;
        let second = hub.broadcast(a, &NormalizedMessage::verbatim("2")).await;

        // Assert
        assert_eq!(first.delivered, 1);
        assert_eq!(second, BroadcastReport { delivered: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_messages_from_one_origin_arrive_in_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx_a) = add_channel_peer(&registry).await;
        let (_b, mut rx_b) = add_channel_peer(&registry).await;
        let hub = BroadcastHub::new(Arc::clone(&registry));

        for n in 0..5 {
            hub.broadcast(a, &NormalizedMessage::verbatim(n.to_string()))
                .await;
        }

        let received: Vec<String> = (0..5).map(|_| rx_b.try_recv().unwrap()).collect();
        assert_eq!(received, vec!["0", "1", "2", "3", "4"]);
    }
}
