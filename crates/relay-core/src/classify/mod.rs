//! First-message classification.
//!
//! The relay speaks to three kinds of producer and tells them apart by the
//! shape of the very first message they send:
//!
//! | First message            | Category         |
//! |--------------------------|------------------|
//! | `512`, ` 3.14 `          | `numeric_client` |
//! | `{"a":1}`, `[1,2]`, `true` | `json_client`  |
//! | anything else            | `text_client`    |
//!
//! Bare unsigned numeric literals are themselves valid JSON, so the numeric
//! grammar is tested first; otherwise no Arduino-style producer could ever be
//! recognised.  Signed or exponent numbers (`-5`, `1e3`) fail the grammar and
//! fall through to `json_client`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::IgnoredAny;

use crate::domain::Category;

/// Unsigned decimal literal: one or more ASCII digits, optionally followed by
/// a single fraction part.  No sign, no exponent.
///
/// `[0-9]` rather than `\d`, which would also match non-ASCII digits.
static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("numeric literal pattern is valid"));

/// Returns `true` if `payload`, once surrounding whitespace is trimmed,
/// matches the numeric-literal grammar.
pub fn is_numeric_literal(payload: &str) -> bool {
    NUMERIC_LITERAL.is_match(payload.trim())
}

/// Determines the category for a connection's first message.
///
/// Always returns one of `NumericClient`, `JsonClient`, or `TextClient`; it
/// never fails and never returns `Unclassified`.
pub fn classify(payload: &str) -> Category {
    if is_numeric_literal(payload) {
        Category::NumericClient
    } else if serde_json::from_str::<IgnoredAny>(payload).is_ok() {
        Category::JsonClient
    } else {
        Category::TextClient
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
