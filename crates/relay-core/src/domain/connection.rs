//! Connection identity, lifecycle state machine, and classification category.
//!
//! # Connection lifecycle (for beginners)
//!
//! Every accepted WebSocket moves through these states, and only forwards:
//!
//! ```text
//! Connecting ──►  Open  ──►  Closing  ──►  Closed
//!                   │                        ▲
//!                   └────────────────────────┘   (abrupt error/disconnect)
//! ```
//!
//! - `Connecting`: TCP accepted, WebSocket handshake not yet complete.
//! - `Open`: handshake complete; the connection sends and receives broadcasts.
//! - `Closing`: a Close frame was seen from either side.
//! - `Closed`: resources released; the registry no longer tracks it.
//!
//! A [`ConnectionRecord`] is the registry's bookkeeping entry for one
//! connection.  It never touches the socket itself.

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ── Identity ──────────────────────────────────────────────────────────────────

/// Unique identity of one accepted connection.
///
/// Generated fresh (UUID v4) for every accept, so a producer that reconnects
/// gets a new identity and is classified again from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Lifecycle state of a connection.
///
/// Variants are declared in lifecycle order; the derived `Ord` is what makes
/// "forward-only" checkable with a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    ///
    /// Legal: `Connecting → Open`, `Open → Closing`, `Closing → Closed`, and
    /// the abrupt `Open → Closed`.  A connection that never finished its
    /// handshake may also go `Connecting → Closed`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closed)
                | (Open, Closing)
                | (Open, Closed)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Returned when a transition would move a connection backwards or skip a
/// required step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal connection state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

// ── Category ──────────────────────────────────────────────────────────────────

/// The permanent message-format classification of a connection.
///
/// Assigned from the first inbound message and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// No message received yet.
    #[default]
    Unclassified,
    /// First message was a JSON document.
    JsonClient,
    /// First message was a bare unsigned numeric literal (an Arduino-style
    /// analog reading).
    NumericClient,
    /// First message was neither.
    TextClient,
}

impl Category {
    pub fn is_classified(self) -> bool {
        self != Category::Unclassified
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Unclassified => "unclassified",
            Category::JsonClient => "json_client",
            Category::NumericClient => "numeric_client",
            Category::TextClient => "text_client",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Bookkeeping entry for one connection, owned by the registry.
///
/// Fields are private so the two invariants hold no matter who holds a
/// `&mut ConnectionRecord`: the state only moves forward, and the category is
/// set at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    state: ConnectionState,
    category: Category,
    created_at: SystemTime,
}

impl ConnectionRecord {
    /// Creates a record in the `Connecting` state with a fresh identity.
    pub fn new(peer_addr: Option<SocketAddr>) -> Self {
        Self::with_id(ConnectionId::new(), peer_addr)
    }

    /// Creates a record in the `Connecting` state with the given identity.
    pub fn with_id(id: ConnectionId, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer_addr,
            state: ConnectionState::Connecting,
            category: Category::Unclassified,
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Moves the record to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the move is not a forward, legal step.
    /// The record is left untouched in that case.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Stores `category` if the record is still unclassified, and returns
    /// the category in effect afterwards.
    ///
    /// Once classified, later calls are ignored and return the original
    /// category.
    pub fn assign_category(&mut self, category: Category) -> Category {
        if !self.category.is_classified() {
            self.category = category;
        }
        self.category
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_starts_connecting_and_unclassified() {
        // Arrange / Act
        let record = ConnectionRecord::new(None);

        // Assert
        assert_eq!(record.state(), ConnectionState::Connecting);
        assert_eq!(record.category(), Category::Unclassified);
        assert!(!record.is_open());
    }

    #[test]
    fn test_full_forward_lifecycle_is_accepted() {
        let mut record = ConnectionRecord::new(None);
        assert!(record.transition(ConnectionState::Open).is_ok());
        assert!(record.transition(ConnectionState::Closing).is_ok());
        assert!(record.transition(ConnectionState::Closed).is_ok());
        assert_eq!(record.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_open_to_closed_is_allowed_on_abrupt_disconnect() {
        let mut record = ConnectionRecord::new(None);
        record.transition(ConnectionState::Open).unwrap();
        assert!(record.transition(ConnectionState::Closed).is_ok());
    }

    #[test]
    fn test_backward_transition_is_rejected_and_state_unchanged() {
        // Arrange
        let mut record = ConnectionRecord::new(None);
        record.transition(ConnectionState::Open).unwrap();
        record.transition(ConnectionState::Closing).unwrap();

        // Act
        let err = record.transition(ConnectionState::Open).unwrap_err();

        // Assert
        assert_eq!(err.from, ConnectionState::Closing);
        assert_eq!(err.to, ConnectionState::Open);
        assert_eq!(record.state(), ConnectionState::Closing);
    }

    #[test]
    fn test_connecting_cannot_jump_to_closing() {
        assert!(!ConnectionState::Connecting.can_transition_to(ConnectionState::Closing));
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert!(!ConnectionState::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_self_transition_is_rejected() {
        assert!(!ConnectionState::Open.can_transition_to(ConnectionState::Open));
    }

    #[test]
    fn test_category_is_assigned_only_once() {
        // Arrange
        let mut record = ConnectionRecord::new(None);

        // Act
        let first = record.assign_category(Category::NumericClient);
        let second = record.assign_category(Category::JsonClient);

        // Assert: the second assignment is ignored
        assert_eq!(first, Category::NumericClient);
        assert_eq!(second, Category::NumericClient);
        assert_eq!(record.category(), Category::NumericClient);
    }

    #[test]
    fn test_category_display_uses_wire_names() {
        assert_eq!(Category::JsonClient.to_string(), "json_client");
        assert_eq!(Category::NumericClient.to_string(), "numeric_client");
        assert_eq!(Category::TextClient.to_string(), "text_client");
        assert_eq!(Category::Unclassified.to_string(), "unclassified");
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_record_keeps_peer_address() {
        let addr: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let record = ConnectionRecord::new(Some(addr));
        assert_eq!(record.peer_addr(), Some(addr));
    }
}
