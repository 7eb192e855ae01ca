//! Parsing rules for single table cells.
//!
//! Each rule accepts exactly the JSON kind the explorer emits for a column
//! and reports anything else as [`DecodeError::MalformedField`].

use crate::error::DecodeError;
use crate::types::Address;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::str::FromStr;

pub(crate) fn parse_u64(column: &str, value: &Value) -> Result<u64, DecodeError> {
    value
        .as_u64()
        .ok_or_else(|| DecodeError::malformed(column, value, "expected unsigned integer"))
}

pub(crate) fn parse_i64(column: &str, value: &Value) -> Result<i64, DecodeError> {
    value
        .as_i64()
        .ok_or_else(|| DecodeError::malformed(column, value, "expected integer"))
}

pub(crate) fn parse_i32(column: &str, value: &Value) -> Result<i32, DecodeError> {
    let n = parse_i64(column, value)?;
    i32::try_from(n).map_err(|_| DecodeError::malformed(column, value, "integer out of range"))
}

pub(crate) fn parse_f64(column: &str, value: &Value) -> Result<f64, DecodeError> {
    value
        .as_f64()
        .ok_or_else(|| DecodeError::malformed(column, value, "expected number"))
}

/// Table-mode booleans are the numbers `0` and `1`; JSON `true`/`false` is rejected.
pub(crate) fn parse_bool(column: &str, value: &Value) -> Result<bool, DecodeError> {
    match value.as_u64() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(DecodeError::malformed(column, value, "expected 0 or 1")),
    }
}

pub(crate) fn parse_str<'a>(column: &str, value: &'a Value) -> Result<&'a str, DecodeError> {
    value
        .as_str()
        .ok_or_else(|| DecodeError::malformed(column, value, "expected string"))
}

/// Milliseconds since the Unix epoch.
pub(crate) fn parse_time(column: &str, value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    let ms = value
        .as_i64()
        .ok_or_else(|| DecodeError::malformed(column, value, "expected millisecond timestamp"))?;
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DecodeError::malformed(column, value, "timestamp out of range"))
}

pub(crate) fn parse_hash<T>(column: &str, value: &Value) -> Result<T, DecodeError>
where
    T: FromStr<Err = DecodeError>,
{
    parse_str(column, value)?
        .parse::<T>()
        .map_err(|e| e.in_column(column))
}

pub(crate) fn parse_address(column: &str, value: &Value) -> Result<Address, DecodeError> {
    Address::parse(parse_str(column, value)?).map_err(|e| e.in_column(column))
}

/// Hex-encoded binary cell; an empty string carries no payload.
pub(crate) fn parse_hex(column: &str, value: &Value) -> Result<Option<Vec<u8>>, DecodeError> {
    let s = parse_str(column, value)?;
    if s.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(s).map_err(|e| DecodeError::malformed(column, value, e.to_string()))?;
    Ok(Some(bytes))
}
