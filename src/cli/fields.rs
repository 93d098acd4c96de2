//! `field=value` arguments turned into JSON documents.

use anyhow::{Result, anyhow};
use crm_store::Document;
use serde_json::Value;

/// Parse `field=value` pairs. Values that read as JSON scalars (numbers,
/// booleans, null) keep that type; anything else is taken as text.
pub fn parse_assignments(assignments: &[String]) -> Result<Document> {
    let mut document = Document::new();
    for assignment in assignments {
        let (field, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got '{assignment}'"))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(anyhow!("empty field name in '{assignment}'"));
        }
        document.insert(field.to_string(), parse_value(raw));
    }
    Ok(document)
}

fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scalars_and_text() {
        let doc = parse_assignments(&[
            "name=Ingeniería".to_string(),
            "studentsCount=12".to_string(),
            "code=\"007\"".to_string(),
            "note=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(doc["name"], json!("Ingeniería"));
        assert_eq!(doc["studentsCount"], json!(12));
        assert_eq!(doc["code"], json!("\"007\""));
        assert_eq!(doc["note"], json!("a=b"));
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(parse_assignments(&["name".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }
}
