//! relay-simulator library crate.
//!
//! A stand-in for a real Arduino board: it connects to the relay over
//! WebSocket and pushes a sensor reading every interval, reconnecting with
//! exponential backoff whenever the connection drops.
//!
//! ```text
//! [relay-simulator]
//!   ├── domain/           SimulatorConfig, RetryPolicy, SensorState (no I/O)
//!   └── infrastructure/
//!         └── producer/   Connect / send / reconnect loop (tokio-tungstenite)
//! ```

pub mod domain;
pub mod infrastructure;
