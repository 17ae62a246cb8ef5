//! Field coercion used while decoding.
//!
//! Every helper takes the raw field as `Option<&Value>`, `None` meaning the
//! key was missing. A JSON `null` is a value and is coerced like one; only
//! cookie expiry dates treat it as missing.

use crate::FormatError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Number coercion that fails instead of producing NaN.
pub fn safe_number(value: Option<&Value>, field: &'static str) -> Result<f64, FormatError> {
    let number = match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => parse_numeric_text(text),
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    };

    if number.is_nan() {
        return Err(FormatError::NotANumber(field));
    }
    Ok(number)
}

pub fn optional_number(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<f64>, FormatError> {
    match value {
        None => Ok(None),
        Some(value) => safe_number(Some(value), field).map(Some),
    }
}

pub fn optional_string(value: Option<&Value>) -> Option<String> {
    value.map(coerce_string)
}

/// Required strings that are missing decode as empty.
pub fn string_or_empty(value: Option<&Value>) -> String {
    optional_string(value).unwrap_or_default()
}

pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e21 => {
                format!("{}", float as i128)
            }
            _ => number.to_string(),
        },
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        compound => compound.to_string(),
    }
}

pub fn optional_bool(value: Option<&Value>) -> Option<bool> {
    value.map(|value| match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Date coercion for fields that order the document; invalid values fail.
pub fn safe_date(
    value: Option<&Value>,
    field: &'static str,
) -> Result<DateTime<Utc>, FormatError> {
    value
        .and_then(parse_date)
        .ok_or(FormatError::InvalidDate(field))
}

/// Date coercion for descriptive metadata; invalid values are dropped.
pub fn lenient_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    present(value).and_then(parse_date)
}

/// Array fields other than `log.entries` fall back to empty.
pub fn array_or_empty(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed
            .chars()
            .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(millis.trunc() as i64).single()
        }
        Value::String(text) => parse_date_text(text.trim()),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    // Cookie style: `Wed, 21-Oct-2015 07:28:00 GMT`
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%a, %d-%b-%Y %H:%M:%S GMT") {
        return Some(date.and_utc());
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(date.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}
