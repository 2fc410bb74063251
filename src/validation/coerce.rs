//! Domain coercion for range and temporal rules.
//!
//! Each domain has one coercion function; a value that does not coerce into
//! the rule's declared domain is a validation failure, never a silent pass.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::types::{RangeBound, RangeDomain};

/// Unquoted string form of a scalar value, used by format and code-set
/// checks. Objects and arrays fall back to their JSON rendering.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an ISO-8601 datetime. Accepts RFC 3339 with offset, a naive
/// `YYYY-MM-DDTHH:MM:SS` form with optional fractional seconds, or a plain
/// date (coerced to midnight). First success wins.
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    parse_date(text).map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Parse a `YYYY-MM-DD` date, falling back to the date part of a datetime.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc().date());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Coerce a record value into the rule's declared domain.
pub(crate) fn coerce_to_domain(
    value: &Value,
    domain: RangeDomain,
) -> std::result::Result<RangeBound, String> {
    match domain {
        RangeDomain::Number => match value {
            Value::Number(n) => n
                .as_f64()
                .map(RangeBound::Number)
                .ok_or_else(|| format!("value '{n}' is not representable as a number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(RangeBound::Number)
                .map_err(|_| format!("value '{s}' could not be coerced to a number")),
            other => Err(format!(
                "value '{}' could not be coerced to a number",
                value_to_string(other)
            )),
        },
        RangeDomain::Date => {
            let text = value_to_string(value);
            parse_date(&text)
                .map(RangeBound::Date)
                .ok_or_else(|| format!("value '{text}' could not be coerced to a date"))
        }
        RangeDomain::DateTime => {
            let text = value_to_string(value);
            parse_datetime(&text)
                .map(RangeBound::DateTime)
                .ok_or_else(|| format!("value '{text}' could not be coerced to a datetime"))
        }
    }
}

/// View a bound in the number domain.
pub(crate) fn bound_as_number(bound: &RangeBound) -> Option<f64> {
    match bound {
        RangeBound::Number(n) => Some(*n),
        _ => None,
    }
}

/// View a bound in the date domain. Datetimes truncate to their date.
pub(crate) fn bound_as_date(bound: &RangeBound) -> Option<NaiveDate> {
    match bound {
        RangeBound::Date(d) => Some(*d),
        RangeBound::DateTime(dt) => Some(dt.date()),
        RangeBound::Number(_) => None,
    }
}

/// View a bound in the datetime domain. Dates widen to midnight.
pub(crate) fn bound_as_datetime(bound: &RangeBound) -> Option<NaiveDateTime> {
    match bound {
        RangeBound::DateTime(dt) => Some(*dt),
        RangeBound::Date(d) => d.and_hms_opt(0, 0, 0),
        RangeBound::Number(_) => None,
    }
}
