//! Shape normalization for billing API responses.
//!
//! The upstream has renamed and re-nested fields across versions, so every
//! lookup is driven by a priority-ordered table of JSON pointers instead of
//! fixed structs. "Not found" is always `None`, never an error.

use crate::models::EntityId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use std::str::FromStr;

/// Keys tried, in order, when a monetary value turns out to be an object.
const NESTED_AMOUNT_KEYS: [&str; 4] = ["value", "amount", "cost", "price"];

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Return the first candidate path that holds a non-null array or object.
pub fn extract<'a>(response: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|path| response.pointer(path))
        .find(|v| v.is_array() || v.is_object())
}

/// Like [`extract`], but always yields a list: an object found at a list path
/// is treated as a single entry, and nothing found is an empty list.
pub fn extract_list<'a>(response: &'a Value, candidates: &[&str]) -> &'a [Value] {
    match extract(response, candidates) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(single) => std::slice::from_ref(single),
        None => &[],
    }
}

/// First candidate path holding a usable value (not null, not a blank string).
pub fn first_defined<'a>(obj: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// First path whose value reads as an identifier.
pub fn pick_id(obj: &Value, paths: &[&str]) -> Option<EntityId> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find_map(EntityId::from_value)
}

/// First path holding a string or number, rendered as text.
pub fn pick_string(obj: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
}

pub fn pick_bytes(obj: &Value, paths: &[&str]) -> Option<u64> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find_map(coerce_bytes)
}

pub fn pick_timestamp(obj: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find_map(coerce_timestamp)
}

pub fn pick_decimal(obj: &Value, paths: &[&str]) -> Option<Decimal> {
    paths
        .iter()
        .filter_map(|path| obj.pointer(path))
        .find_map(coerce_decimal)
}

/// Coerce a monetary value: a JSON number, a numeric string (currency symbols
/// and other noise stripped), or an object carrying `value`/`amount`/`cost`/`price`.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            Decimal::from_str(&cleaned).ok()
        }
        Value::Object(map) => NESTED_AMOUNT_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|v| match v {
                // one level only: {price: {value: 3}} but not arbitrarily deep
                Value::Object(_) => None,
                other => coerce_decimal(other),
            }),
        _ => None,
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
}

/// Coerce a byte count. Negative and non-numeric values are rejected.
pub fn coerce_bytes(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
        }
        _ => None,
    }
}

/// Coerce a timestamp from RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, or
/// epoch seconds/milliseconds.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_epoch),
        Value::String(s) => parse_timestamp(s.trim()),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    s.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}
