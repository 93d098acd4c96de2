//! Tolerant field decoders.
//!
//! Records arrive from spreadsheets and hand-edited storage, so a phone number
//! may be stored as a number and a head-count as `"12"`. These decoders accept
//! the shapes seen in practice instead of rejecting the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Optional text: strings as-is, numbers and booleans rendered, null as `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Required text with the same rules as [`opt_string`], defaulting to empty.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

/// Non-negative count. Numeric strings are parsed, fractions truncated,
/// negatives and anything unreadable become 0.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => number_to_count(n.as_f64()),
        Some(Value::String(s)) => number_to_count(s.trim().parse::<f64>().ok()),
        _ => 0,
    })
}

fn number_to_count(n: Option<f64>) -> u64 {
    match n {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}
