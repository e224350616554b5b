//! Infrastructure layer for the simulator.

pub mod producer;

pub use producer::{Producer, ProducerError};
