//! Provider timestamp parsing.
//!
//! Every parser takes the ingestion time as its fallback; a notification with
//! a missing or unparsable timestamp is recorded at the time it arrived.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Parses an RFC 3339 timestamp.
pub fn rfc3339_or(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_rfc3339).unwrap_or(fallback)
}

/// Converts Unix epoch seconds, possibly fractional.
pub fn epoch_seconds_or(raw: Option<f64>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(from_epoch_seconds).unwrap_or(fallback)
}

/// Parses RFC 3339 first, then Unix epoch seconds written as a decimal
/// string. JSON numbers are read as epoch seconds.
pub fn rfc3339_or_epoch_or(raw: Option<&Value>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match raw {
        Some(Value::String(text)) => parse_rfc3339(text)
            .or_else(|| text.trim().parse::<f64>().ok().and_then(from_epoch_seconds)),
        Some(Value::Number(number)) => number.as_f64().and_then(from_epoch_seconds),
        _ => None,
    };
    parsed.unwrap_or(fallback)
}

fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim()).ok().map(|dt| dt.with_timezone(&Utc))
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = seconds.trunc();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = ((seconds - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    #[allow(clippy::cast_possible_truncation)]
    Utc.timestamp_opt(whole as i64, nanos).single()
}
