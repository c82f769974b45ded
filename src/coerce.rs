//! Best-effort type coercion for raw query-string payloads.
//!
//! Every criteria payload arrives as a string. Before it reaches the record
//! store it is pushed through an ordered pipeline: boolean words first, then
//! the null-ish words, then (only for date-typed attributes) a date parse.
//! Anything that survives the pipeline untouched stays a string — payloads
//! are never implicitly cast to numbers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

use crate::schema::AttributeType;

/// A coerced filter payload.
///
/// Booleans render as `1`/`0` and null as the empty string, matching the
/// query-string grammar; dates render as RFC 3339 so a serialized value
/// re-parses to the same instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// An uninterpreted string payload.
    Str(String),
    /// An integer, only ever produced by caller-constructed criteria.
    Number(i64),
    /// `true`/`false` (case-insensitive) in the payload.
    Bool(bool),
    /// `null`, `undefined` or an empty payload.
    Null,
    /// A payload parsed against a date-typed attribute.
    Date(DateTime<Utc>),
}

impl Value {
    /// Shorthand for building a string value in tests and defaults.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => f.write_str(if *value { "1" } else { "0" }),
            Self::Null => Ok(()),
            Self::Date(value) => f.write_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Run the ordered coercion pipeline over one trimmed payload.
///
/// The priority is fixed: boolean words beat null words beat date parsing.
/// Date parsing applies only when the attribute is date-typed, trying a Unix
/// timestamp before a free-form date string; if both fail the raw string is
/// kept unchanged rather than rejected.
#[must_use]
pub fn coerce_value(raw: &str, kind: AttributeType) -> Value {
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("undefined") {
        return Value::Null;
    }
    if kind == AttributeType::Date {
        if let Some(date) = date_from_unix_timestamp(raw).or_else(|| date_from_string(raw)) {
            return Value::Date(date);
        }
    }
    Value::Str(raw.to_string())
}

/// Interpret a payload as a Unix timestamp in seconds (fractions allowed).
#[must_use]
pub fn date_from_unix_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = raw.trim().parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Interpret a payload as a calendar date or datetime string.
///
/// RFC 3339 wins, then the common `Y-m-d H:M[:S]` forms, then a bare date.
#[must_use]
pub fn date_from_string(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&parsed.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Parse a JSON string into a non-empty object or array.
///
/// Scalars, empty containers and malformed input all yield `None` so callers
/// can fall back without error handling.
#[must_use]
pub fn try_parse_json(raw: &str) -> Option<serde_json::Value> {
    let parsed: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let empty = parsed.as_object().is_some_and(serde_json::Map::is_empty)
        || parsed.as_array().is_some_and(Vec::is_empty);
    ((parsed.is_object() || parsed.is_array()) && !empty).then_some(parsed)
}
