//! Field mappings read from a type's options blob

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    pub field_type: Option<String>,
    /// Text-search configuration used for full-text matching, e.g. `english`
    pub analyzer: Option<String>,
}

/// Per-field configuration of one type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMapping {
    fields: BTreeMap<String, FieldMapping>,
}

impl TypeMapping {
    /// Parse the options blob stored for `type_name`.
    ///
    /// `properties` is looked up at the top level, then under `{type}`, then
    /// under `mappings.{type}`. Empty or unparsable options give an empty
    /// mapping.
    pub fn from_options(type_name: &str, options: &str) -> Self {
        let Ok(root) = serde_json::from_str::<Value>(options) else {
            return Self::default();
        };

        let properties = root
            .get("properties")
            .or_else(|| root.get(type_name).and_then(|t| t.get("properties")))
            .or_else(|| {
                root.get("mappings")
                    .and_then(|m| m.get(type_name))
                    .and_then(|t| t.get("properties"))
            })
            .and_then(Value::as_object);

        let fields = properties
            .map(|props| {
                props
                    .iter()
                    .map(|(name, spec)| {
                        let text = |key: &str| spec.get(key).and_then(Value::as_str).map(String::from);
                        (
                            name.clone(),
                            FieldMapping {
                                field_type: text("type"),
                                analyzer: text("analyzer").filter(|a| !a.is_empty()),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn analyzer(&self, field: &str) -> Option<&str> {
        self.field(field).and_then(|f| f.analyzer.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_properties() {
        let m = TypeMapping::from_options(
            "tweet",
            r#"{"properties":{"message":{"type":"text","analyzer":"english"},"user":{"type":"keyword"}}}"#,
        );
        assert_eq!(m.analyzer("message"), Some("english"));
        assert_eq!(m.analyzer("user"), None);
        assert_eq!(m.field("user").unwrap().field_type.as_deref(), Some("keyword"));
    }

    #[test]
    fn test_nested_under_type_and_mappings() {
        let m = TypeMapping::from_options(
            "tweet",
            r#"{"tweet":{"properties":{"message":{"analyzer":"english"}}}}"#,
        );
        assert_eq!(m.analyzer("message"), Some("english"));

        let m = TypeMapping::from_options(
            "tweet",
            r#"{"mappings":{"tweet":{"properties":{"message":{"analyzer":"russian"}}}}}"#,
        );
        assert_eq!(m.analyzer("message"), Some("russian"));
    }

    #[test]
    fn test_empty_or_invalid_options() {
        assert!(TypeMapping::from_options("t", "").is_empty());
        assert!(TypeMapping::from_options("t", "not json").is_empty());
        assert!(TypeMapping::from_options("t", r#"{"properties":[1,2]}"#).is_empty());
    }
}
