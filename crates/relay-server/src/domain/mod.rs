//! Domain layer for relay-server.
//!
//! Only configuration lives here; the relay's business types are in
//! `relay-core`.

pub mod config;

pub use config::RelayConfig;
