//! Simulated sensor board.
//!
//! [`SensorState`] drifts a little on every [`step`](SensorState::step):
//!
//! | Field         | Per step                    | Bounds               |
//! |---------------|-----------------------------|----------------------|
//! | temperature   | += uniform(-1, 1)           | clamped to 15..=35   |
//! | humidity      | += 1                        | wraps to 30 above 90 |
//! | sensor value  | += floor(uniform(-50, 50))  | clamped to 0..=1023  |
//! | uptime        | += 1                        |                      |
//!
//! Free memory and Wi-Fi signal strength are pure noise, drawn fresh for every
//! reading.  All randomness comes from a caller-supplied [`Rng`] so tests can
//! seed it.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Device name reported in the connection announcement.
pub const DEVICE_NAME: &str = "Arduino";

/// Address reported in the connection announcement.
pub const DEVICE_IP: &str = "192.168.1.100";

const TEMPERATURE_RANGE: (f64, f64) = (15.0, 35.0);
const HUMIDITY_CEILING: f64 = 90.0;
const HUMIDITY_RESET: f64 = 30.0;
const SENSOR_VALUE_MAX: i32 = 1023;

/// One JSON reading as sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Degrees Celsius, two decimal places.
    pub temperature: f64,
    /// Percent, one decimal place.
    pub humidity: f64,
    /// Raw 10-bit analog reading.
    pub sensor_value: i32,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Readings sent since the simulator started.
    pub uptime: u64,
    pub free_memory: u32,
    #[serde(rename = "wifiRSSI")]
    pub wifi_rssi: i32,
}

/// First message sent on every JSON-mode connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAnnouncement {
    pub status: String,
    pub device: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub ip: String,
}

impl ConnectionAnnouncement {
    pub fn new(timestamp: i64) -> Self {
        Self {
            status: "connected".to_string(),
            device: DEVICE_NAME.to_string(),
            timestamp,
            ip: DEVICE_IP.to_string(),
        }
    }
}

/// Evolving sensor values.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    temperature: f64,
    humidity: f64,
    sensor_value: i32,
    uptime: u64,
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60.0,
            sensor_value: 512,
            uptime: 0,
        }
    }
}

impl SensorState {
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn sensor_value(&self) -> i32 {
        self.sensor_value
    }

    pub fn uptime(&self) -> u64 {
        self.uptime
    }

    /// Advances every value by one tick.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (min_t, max_t) = TEMPERATURE_RANGE;
        self.temperature = (self.temperature + rng.random_range(-1.0..1.0)).clamp(min_t, max_t);

        self.humidity += 1.0;
        if self.humidity > HUMIDITY_CEILING {
            self.humidity = HUMIDITY_RESET;
        }

        let jitter = rng.random_range(-50.0..50.0_f64).floor() as i32;
        self.sensor_value = (self.sensor_value + jitter).clamp(0, SENSOR_VALUE_MAX);

        self.uptime += 1;
    }

    /// Snapshot of the current values as a JSON reading.
    pub fn reading<R: Rng + ?Sized>(&self, rng: &mut R, timestamp: i64) -> SensorReading {
        SensorReading {
            temperature: round_to(self.temperature, 2),
            humidity: round_to(self.humidity, 1),
            sensor_value: self.sensor_value,
            timestamp,
            uptime: self.uptime,
            free_memory: rng.random_range(1536..2048),
            wifi_rssi: rng.random_range(-70..-40),
        }
    }

    /// The current sensor value as a bare decimal literal.
    pub fn numeric_payload(&self) -> String {
        self.sensor_value.to_string()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
