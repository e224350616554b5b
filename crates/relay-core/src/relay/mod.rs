//! Shared relay state: who is connected, and how to reach them.
//!
//! - [`registry`] – the connection registry (lifecycle + classification).
//! - [`hub`] – broadcast fan-out over a snapshot of the registry.
//! - [`sink`] – the [`PeerSink`] seam between the hub and a transport.

pub mod hub;
pub mod registry;
pub mod sink;

pub use hub::{BroadcastHub, BroadcastReport};
pub use registry::{ConnectionRegistry, LivePeer, RegistryError};
pub use sink::{DeliveryError, PeerSink};
