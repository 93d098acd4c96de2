use super::{CollectionKind, Document, Entity, lenient};
use serde::{Deserialize, Serialize};

/// A program of study ("carrera"). `escuela_id` is a soft reference: nothing
/// checks that the institution exists, and deleting one leaves it dangling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub escuela_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub students_count: u64,
    /// Expected population used for planning.
    #[serde(default, deserialize_with = "lenient::count")]
    pub expected_population: u64,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_institution(mut self, escuela_id: impl Into<String>) -> Self {
        self.escuela_id = Some(escuela_id.into());
        self
    }
}

impl Entity for Program {
    const KIND: CollectionKind = CollectionKind::Programs;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escuela_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_population: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_default_to_zero() {
        let program: Program = serde_json::from_value(json!({"id": "car_1", "name": "Acme"})).unwrap();
        assert_eq!(program.students_count, 0);
        assert_eq!(program.expected_population, 0);
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(Program::new("Acme").with_code("AC").with_institution("esc_1")).unwrap();
        assert_eq!(value["escuelaId"], json!("esc_1"));
        assert_eq!(value["studentsCount"], json!(0));
        assert!(value.get("logo").is_none());
    }
}
