//! Raw and normalized message types.
//!
//! # Message flow
//!
//! ```text
//! WebSocket frame ──► RawMessage ──► normalize() ──► NormalizedMessage ──► peers
//! ```
//!
//! A [`NormalizedMessage`] always carries the exact text that goes on the
//! wire.  For numeric producers it additionally keeps the structured
//! [`NumericEnvelope`] it was serialized from, which is handy for logging and
//! tests.

use serde::{Deserialize, Serialize, Serializer};

use super::connection::ConnectionId;

/// Value of the `source` field in every numeric envelope.
///
/// Dashboards key off this string to tell analog readings apart from
/// structured sensor documents.
pub const ENVELOPE_SOURCE: &str = "arduino";

/// An inbound message, exactly as received, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    origin: ConnectionId,
    payload: String,
}

impl RawMessage {
    pub fn new(origin: ConnectionId, payload: impl Into<String>) -> Self {
        Self {
            origin,
            payload: payload.into(),
        }
    }

    /// Builds a message from a binary frame.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD rather than rejected;
    /// the relay never drops a frame because of its encoding.
    pub fn from_bytes(origin: ConnectionId, bytes: &[u8]) -> Self {
        Self::new(origin, String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn origin(&self) -> ConnectionId {
        self.origin
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// The structured form of a numeric reading.
///
/// Serializes as:
///
/// ```json
/// {"value":23.5,"timestamp":"2024-05-01T12:00:00.000Z","source":"arduino"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericEnvelope {
    /// Integral values are written without a fraction (`512`, not `512.0`).
    #[serde(serialize_with = "serialize_reading")]
    pub value: f64,
    /// UTC wall-clock time the reading was relayed, ISO-8601 with
    /// millisecond precision.
    pub timestamp: String,
    pub source: String,
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn serialize_reading<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// A message ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    payload: String,
    envelope: Option<NumericEnvelope>,
}

impl NormalizedMessage {
    /// Wraps an untouched payload.
    pub fn verbatim(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            envelope: None,
        }
    }

    /// Wraps an envelope together with its serialized text.
    pub fn enveloped(envelope: NumericEnvelope, payload: String) -> Self {
        Self {
            payload,
            envelope: Some(envelope),
        }
    }

    /// The exact text sent to every peer.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The structured envelope, if this message came from a numeric producer
    /// and parsed successfully.
    pub fn envelope(&self) -> Option<&NumericEnvelope> {
        self.envelope.as_ref()
    }

    pub fn is_enveloped(&self) -> bool {
        self.envelope.is_some()
    }
}
