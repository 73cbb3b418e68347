//! Forgiving field deserializers for browser payloads.
//!
//! Browsers drop `undefined` fields, send `null` for unknown values and emit
//! fractional timestamps. Only the fields the engine computes on are strict;
//! everything else goes through these helpers with `#[serde(default)]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any value that does not fit `T` (including `null`) becomes `T::default()`
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Any value that does not fit `T` (including `null`) becomes `None`
pub fn or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Numbers and numeric strings become `Some`, anything else `None`
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_f64(&Value::deserialize(deserializer)?))
}

/// Epoch milliseconds; fractional values are truncated, unusable values are 0
pub fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(ms) = value.as_i64() {
        return Ok(ms);
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(as_f64(&value)
        .filter(|ms| ms.is_finite())
        .map_or(0, |ms| ms.trunc() as i64))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
