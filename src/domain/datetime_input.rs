//! Parsing and formatting of date-time form values.
//!
//! Browsers submit `<input type="datetime-local">` values without an offset
//! (`2024-05-01T09:30`). Those are read as UTC. Full RFC 3339 values are
//! accepted as well, and an empty field means "no value".

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use super::value_objects::Timestamp;

/// Shape used to prefill an edit form.
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Naive shapes accepted on input, most common first.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// The value is neither empty, RFC 3339, nor a `datetime-local` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date-time '{0}': expected YYYY-MM-DDTHH:MM or RFC 3339")]
pub struct InvalidDateTime(pub String);

/// Parses a form value into an optional timestamp.
///
/// # Errors
///
/// Returns [`InvalidDateTime`] if the value is non-empty and matches no
/// accepted shape.
pub fn parse(value: &str) -> Result<Option<Timestamp>, InvalidDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(Timestamp::from_datetime(datetime.with_timezone(&Utc))));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Some(Timestamp::from_datetime(naive.and_utc())))
        .ok_or_else(|| InvalidDateTime(value.to_string()))
}

/// Parses an optional form value; `None` and `""` both mean "no value".
///
/// # Errors
///
/// Returns [`InvalidDateTime`] if a present value cannot be parsed.
pub fn parse_optional(value: Option<&str>) -> Result<Option<Timestamp>, InvalidDateTime> {
    value.map_or(Ok(None), parse)
}

/// Formats a timestamp for an edit form, `""` when absent.
#[must_use]
pub fn format(timestamp: Option<&Timestamp>) -> String {
    timestamp.map_or_else(String::new, |timestamp| {
        timestamp.as_datetime().format(INPUT_FORMAT).to_string()
    })
}
