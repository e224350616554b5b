//! Category-driven message normalization.
//!
//! Only numeric producers get rewritten.  Their bare readings (`"23.5"`) become
//! a self-describing envelope so dashboards do not need to know which socket a
//! value came from:
//!
//! ```text
//! "23.5"  ──►  {"value":23.5,"timestamp":"2024-05-01T12:00:00.000Z","source":"arduino"}
//! ```
//!
//! Everything else passes through byte-for-byte.  JSON payloads are *not*
//! reparsed or reserialized, so their formatting survives the relay intact.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::classify::is_numeric_literal;
use crate::domain::{Category, NormalizedMessage, NumericEnvelope, RawMessage, ENVELOPE_SOURCE};

/// Normalizes `raw` for broadcast, stamping numeric envelopes with the
/// current UTC time.
pub fn normalize(category: Category, raw: &RawMessage) -> NormalizedMessage {
    normalize_at(category, raw, Utc::now())
}

/// Same as [`normalize`], with an explicit timestamp.
pub fn normalize_at(category: Category, raw: &RawMessage, now: DateTime<Utc>) -> NormalizedMessage {
    match category {
        Category::NumericClient => envelope_or_raw(raw, now),
        Category::JsonClient | Category::TextClient | Category::Unclassified => {
            NormalizedMessage::verbatim(raw.payload())
        }
    }
}

/// Builds the numeric envelope, or falls back to the raw payload.
///
/// A numeric connection is classified once, so later messages need not be
/// numbers at all.  Only payloads matching the same grammar used for
/// classification and parsing to a finite `f64` are wrapped; anything else
/// (`-5`, `1e3`, JSON) is forwarded unchanged.
fn envelope_or_raw(raw: &RawMessage, now: DateTime<Utc>) -> NormalizedMessage {
    let parsed = if is_numeric_literal(raw.payload()) {
        raw.payload().trim().parse::<f64>().ok()
    } else {
        None
    };
    let value = match parsed {
        Some(v) if v.is_finite() => v,
        _ => {
            warn!(
                "connection {}: numeric payload did not parse; forwarding raw",
                raw.origin()
            );
            return NormalizedMessage::verbatim(raw.payload());
        }
    };

    let envelope = NumericEnvelope {
        value,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        source: ENVELOPE_SOURCE.to_string(),
    };

    match serde_json::to_string(&envelope) {
        Ok(payload) => NormalizedMessage::enveloped(envelope, payload),
        Err(e) => {
            warn!(
                "connection {}: envelope serialization failed ({e}); forwarding raw",
                raw.origin()
            );
            NormalizedMessage::verbatim(raw.payload())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
