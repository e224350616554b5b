//! # relay-core
//!
//! The state-machine half of sensor-relay: everything that decides *what*
//! happens to a message, with no sockets in sight.
//!
//! # Architecture overview (for beginners)
//!
//! A producer (a real or simulated sensor) opens a WebSocket to the relay and
//! pushes readings.  The relay looks at the *first* message on each connection
//! to decide what kind of client it is talking to, and then rebroadcasts every
//! message from that connection to all other connected peers.
//!
//! ```text
//! accept ──► ConnectionRegistry::add
//!              │
//!   message ──►├─ classify_once   (first message only)
//!              ├─ normalize       (numeric → JSON envelope, else verbatim)
//!              └─ BroadcastHub::broadcast (everyone except the origin)
//!              │
//! close/error ─► ConnectionRegistry::remove (exactly once)
//! ```
//!
//! - **`domain`** – Connection identity, lifecycle state machine, categories,
//!   and the raw/normalized message types.
//! - **`classify`** – The classifier and the numeric-literal grammar.
//! - **`normalize`** – Turns a raw message into its broadcast payload.
//! - **`relay`** – The shared connection registry and the broadcast hub.
//!
//! The transport is abstracted behind [`PeerSink`]: the server crate plugs in
//! a bounded channel feeding a WebSocket writer, tests plug in recorders and
//! mocks.

pub mod classify;
pub mod domain;
pub mod normalize;
pub mod relay;

pub use classify::{classify, is_numeric_literal};
pub use domain::{
    Category, ConnectionId, ConnectionRecord, ConnectionState, NormalizedMessage,
    NumericEnvelope, RawMessage, TransitionError,
};
pub use normalize::{normalize, normalize_at};
pub use relay::{
    BroadcastHub, BroadcastReport, ConnectionRegistry, DeliveryError, LivePeer, PeerSink,
    RegistryError,
};
