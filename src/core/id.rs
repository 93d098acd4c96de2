//! Collision-resistant record identifiers.
//!
//! An identifier is `{prefix}_{counter}_{micros}_{suffix}`:
//! - `counter` is a process-wide monotonic sequence, so two calls in the same
//!   process never collide;
//! - `micros` is the wall clock in microseconds;
//! - `suffix` is nine random hex characters, which keeps identifiers minted
//!   by separate sessions apart.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

const SEPARATOR: char = '_';
const SUFFIX_LEN: usize = 9;

/// Marker some producers write for a missing identifier.
const UNDEFINED_ID: &str = "undefined";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mint a fresh identifier for a record of the collection using `prefix`.
pub fn new_id(prefix: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let micros = chrono::Utc::now().timestamp_micros();
    let random = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &random[..SUFFIX_LEN];
    format!("{prefix}{SEPARATOR}{counter}{SEPARATOR}{micros}{SEPARATOR}{suffix}")
}

/// A stored identifier is usable when it is a non-empty string other than `"undefined"`.
pub fn is_valid_id(value: &Value) -> bool {
    match value {
        Value::String(id) => !id.is_empty() && id != UNDEFINED_ID,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_within_process() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_id("esc")).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_id_layout() {
        let id = new_id("car");
        let parts: Vec<&str> = id.split(SEPARATOR).collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "car");
        assert!(parts[1].parse::<u64>().is_ok());
        assert!(parts[2].parse::<i64>().is_ok());
        assert_eq!(parts[3].len(), SUFFIX_LEN);
    }

    #[test]
    fn test_counter_is_monotonic() {
        let counter = |id: String| id.split(SEPARATOR).nth(1).unwrap().parse::<u64>().unwrap();
        let first = counter(new_id("x"));
        let second = counter(new_id("x"));
        assert!(second > first);
    }

    #[test]
    fn test_valid_id_rules() {
        assert!(is_valid_id(&json!("esc_1_2_abc")));
        assert!(!is_valid_id(&json!("")));
        assert!(!is_valid_id(&json!("undefined")));
        assert!(!is_valid_id(&Value::Null));
        assert!(!is_valid_id(&json!(42)));
    }
}
