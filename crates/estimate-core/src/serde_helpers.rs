//! Forgiving field decoders for persisted snapshots.
//!
//! Older snapshots were written by hand-edited browser storage, so numbers can
//! arrive as strings, containers can be `null`, and timestamps can be garbage.
//! None of that should stop a project from loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Any number, numeric string, or nothing (→ 0). Negative values are clamped to 0.
pub fn non_negative_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0.0).max(0.0))
}

/// Integers stored as numbers or strings; fractional values are truncated.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.min(u32::MAX as f64) as u32)
        .unwrap_or(0))
}

/// Strings, with numbers rendered as text and anything else treated as empty.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// ISO-8601 timestamps; unparsable input falls back to the current time.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}

/// `null` or a missing value becomes `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "non_negative_f64")]
        hours: f64,
        #[serde(default, deserialize_with = "lenient_u32")]
        count: u32,
        #[serde(default, deserialize_with = "lenient_string")]
        id: String,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let p = probe(r#"{"hours": "2.5", "count": "3", "id": 7}"#);
        assert_eq!(p.hours, 2.5);
        assert_eq!(p.count, 3);
        assert_eq!(p.id, "7");
    }

    #[test]
    fn garbage_and_negatives_fall_back_to_zero() {
        let p = probe(r#"{"hours": "lots", "count": -4, "id": null}"#);
        assert_eq!(p.hours, 0.0);
        assert_eq!(p.count, 0);
        assert_eq!(p.id, "");

        let p = probe(r#"{"hours": -3}"#);
        assert_eq!(p.hours, 0.0);
    }
}
