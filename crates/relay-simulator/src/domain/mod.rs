//! Domain layer for the simulator: configuration, retry policy, and the
//! sensor model.  Nothing here performs I/O.

pub mod config;
pub mod retry;
pub mod sensor;

pub use config::{PayloadMode, SimulatorConfig};
pub use retry::RetryPolicy;
pub use sensor::{ConnectionAnnouncement, SensorReading, SensorState};
