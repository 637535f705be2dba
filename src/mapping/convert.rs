use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::{MapError, ROOT_PATH};

/// Conversion of a single JSON value into a leaf field type.
///
/// Implementations coerce between numeric and string representations before
/// giving up. Null is handled by the mapper and only reaches `from_json`
/// for sequence elements.
pub trait FromJson: Sized {
    const EXPECTED: &'static str;

    fn from_json(value: &Value) -> Result<Self, MapError>;
}

fn mismatch<T: FromJson>(value: &Value) -> MapError {
    MapError::mismatch(T::EXPECTED, value)
}

impl FromJson for String {
    const EXPECTED: &'static str = "string";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Object(_) | Value::Array(_) => Ok(value.to_string()),
            Value::Null => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromJson for bool {
    const EXPECTED: &'static str = "bool";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_u64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        };
        parsed.ok_or_else(|| mismatch::<Self>(value))
    }
}

// 2^63 and 2^64. `i64::MAX as f64` and `u64::MAX as f64` round up to these,
// so the upper bounds must be exclusive.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const U64_UPPER: f64 = 18_446_744_073_709_551_616.0;

fn integral(f: f64) -> Option<f64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f)
}

fn float_to_i64(f: f64) -> Option<i64> {
    integral(f)
        .filter(|f| (-I64_UPPER..I64_UPPER).contains(f))
        .map(|f| f as i64)
}

fn float_to_u64(f: f64) -> Option<u64> {
    integral(f)
        .filter(|f| (0.0..U64_UPPER).contains(f))
        .map(|f| f as u64)
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
        }
        _ => None,
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

impl FromJson for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        parse_i64(value).ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromJson for i32 {
    const EXPECTED: &'static str = "i32";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        parse_i64(value)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromJson for u64 {
    const EXPECTED: &'static str = "u64";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        parse_u64(value).ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromJson for u32 {
    const EXPECTED: &'static str = "u32";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        parse_u64(value)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromJson for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        parse_f64(value).ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromJson for Value {
    const EXPECTED: &'static str = "json";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        Ok(value.clone())
    }
}

/// Graph API timestamp layout, e.g. `2012-03-01T17:20:07+0000`.
const GRAPH_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, GRAPH_DATE_FORMAT) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

impl FromJson for DateTime<Utc> {
    const EXPECTED: &'static str = "date";

    fn from_json(value: &Value) -> Result<Self, MapError> {
        let parsed = match value {
            Value::String(s) => parse_date(s),
            Value::Number(_) => parse_i64(value).and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        };
        parsed.ok_or_else(|| mismatch::<Self>(value))
    }
}

impl<T: FromJson> FromJson for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_json(value: &Value) -> Result<Self, MapError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_json(other).map(Some),
        }
    }
}

/// Uppercase, with `-` and whitespace folded to `_`.
pub(crate) fn normalize_variant(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c == '-' || c.is_whitespace() {
                '_'
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Resolve a raw API string against the variant names of `E`.
pub(crate) fn enum_from_json<E>(value: &Value) -> Result<E, MapError>
where
    E: FromStr + strum::VariantNames,
{
    let Some(raw) = value.as_str() else {
        return Err(MapError::mismatch("string", value));
    };
    let normalized = normalize_variant(raw);
    E::VARIANTS
        .iter()
        .find(|variant| normalize_variant(variant) == normalized)
        .and_then(|variant| E::from_str(variant).ok())
        .ok_or_else(|| {
            tracing::debug!(
                raw,
                enum_type = short_type_name::<E>(),
                known = ?E::VARIANTS,
                "no enum variant matches"
            );
            MapError::UnknownEnumVariant {
                path: ROOT_PATH.to_string(),
                enum_type: short_type_name::<E>(),
                raw: raw.to_string(),
            }
        })
}
