//! Domain types for the relay.
//!
//! Pure data and state-machine rules: no locks, no channels, no sockets.
//!
//! # What belongs here?
//!
//! - Connection identity and the per-connection lifecycle state machine
//! - The classification [`Category`] enum
//! - Raw and normalized message types, including the numeric envelope

pub mod connection;
pub mod message;

pub use connection::{Category, ConnectionId, ConnectionRecord, ConnectionState, TransitionError};
pub use message::{NormalizedMessage, NumericEnvelope, RawMessage, ENVELOPE_SOURCE};
