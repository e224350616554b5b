//! relay-server library crate.
//!
//! The WebSocket front end of sensor-relay.  All decisions about *what* to do
//! with a message live in `relay-core`; this crate owns sockets, tasks, and
//! configuration.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Producers / dashboards (WebSocket text frames)
//!         ↕
//! [relay-server]
//!   ├── domain/           RelayConfig
//!   ├── application/      RelayService: open → handle_message → close
//!   └── infrastructure/
//!         └── ws_server/  Accept loop and per-connection reader/writer (tokio-tungstenite)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `relay-core` only; it never sees a
//!   socket, only a [`relay_core::PeerSink`].
//! - `infrastructure` depends on everything plus `tokio` and `tungstenite`.

/// Domain layer: configuration (no I/O).
pub mod domain;

/// Application layer: the relay pipeline.
pub mod application;

/// Infrastructure layer: WebSocket server.
pub mod infrastructure;
