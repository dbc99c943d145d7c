//! JSON-pointer listing parser for API-style sources.

use aiscout_shared::{AiScoutError, ExtractionRules, ListingField, Result};
use serde_json::Value;

use super::{ExtractedFields, ListingParser, insert_field};

/// Extracts listings from a JSON body using the rule set's JSON pointers.
pub struct JsonListParser;

impl ListingParser for JsonListParser {
    fn extract(&self, body: &str, rules: &ExtractionRules) -> Result<Vec<ExtractedFields>> {
        let root: Value = serde_json::from_str(body)
            .map_err(|e| AiScoutError::parse(format!("response is not valid JSON: {e}")))?;

        // A missing or non-array pointer target counts as "no match" so that
        // fallback rule sets still get a chance.
        let Some(items) = root.pointer(&rules.item).and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        let entries = rules.fields.entries();
        let mut listings = Vec::new();

        for item in items {
            let mut fields = ExtractedFields::new();
            for (field, pointer) in &entries {
                if let Some(value) = item.pointer(pointer).and_then(scalar_text) {
                    insert_field(&mut fields, *field, &value);
                }
            }
            if fields.contains_key(&ListingField::Title) {
                listings.push(fields);
            }
        }

        Ok(listings)
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Render a JSON value as field text. Arrays of scalars join with ", ";
/// objects and nulls yield nothing.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(values) => {
            let parts: Vec<String> = values
                .iter()
                .filter(|v| !v.is_array())
                .filter_map(scalar_text)
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscout_shared::FieldRules;
    use serde_json::json;

    #[test]
    fn scalar_rendering() {
        assert_eq!(scalar_text(&json!("x")), Some("x".into()));
        assert_eq!(scalar_text(&json!(3101)), Some("3101".into()));
        assert_eq!(scalar_text(&json!(["AI", "데이터"])), Some("AI, 데이터".into()));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({"a": 1})), None);
    }

    #[test]
    fn root_pointer_addresses_top_level_array() {
        let rules = ExtractionRules {
            item: String::new(),
            fields: FieldRules {
                title: Some("/t".into()),
                ..FieldRules::default()
            },
        };
        let out = JsonListParser
            .extract(r#"[{"t":"A"},{"t":"B"},{"x":1}]"#, &rules)
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        let rules = ExtractionRules {
            item: "/rows".into(),
            fields: FieldRules {
                title: Some("/name".into()),
                ..FieldRules::default()
            },
        };
        let err = JsonListParser.extract("<html>", &rules).unwrap_err();
        assert!(matches!(err, AiScoutError::Parse { .. }));
    }
}
