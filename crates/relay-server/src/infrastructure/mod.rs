//! Infrastructure layer for relay-server.
//!
//! Handles all I/O: binding the listener, upgrading connections to
//! WebSocket, and running each connection's reader and writer.
//!
//! # What does NOT belong here?
//!
//! - Classification, normalization, or fan-out rules (`relay-core`)
//! - Configuration parsing (done in `main.rs`)

pub mod ws_server;

pub use ws_server::{run_server, serve};
