//! Application layer for relay-server.
//!
//! Orchestrates the relay pipeline for one message at a time: classify on
//! first contact, normalize, broadcast.  It knows *what* to do with a message
//! but never touches a socket.

pub mod relay_service;

pub use relay_service::{RelayError, RelayService};
