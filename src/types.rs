//! Core types and reserved keys shared by the composition engine.

use serde_json::Value;

/// Prefix that marks a UI-schema key as a directive rather than a child overlay.
pub const UI_PREFIX: &str = "ui:";

pub const UI_FIELD: &str = "ui:field";
pub const UI_WIDGET: &str = "ui:widget";
pub const UI_DISABLED: &str = "ui:disabled";
pub const UI_READONLY: &str = "ui:readOnly";
pub const UI_AUTOFOCUS: &str = "ui:autoFocus";
pub const UI_TITLE: &str = "ui:title";
pub const UI_DESCRIPTION: &str = "ui:description";
pub const UI_HELP: &str = "ui:help";
pub const UI_ORDER: &str = "ui:order";
pub const UI_OPTIONS: &str = "ui:options";

/// Overlay key carrying extra class names. Consumed by the node it is on.
pub const CLASS_NAMES: &str = "classNames";

/// Widget directive value that hides a field's chrome.
pub const HIDDEN_WIDGET: &str = "hidden";

/// Error-tree key holding a node's own messages.
pub const ERRORS_KEY: &str = "__errors";

/// Schema key of a reference into the definitions table.
pub const REF_KEY: &str = "$ref";

/// Identity-schema key holding a node's identifier.
pub const ID_KEY: &str = "$id";

/// Default identifier prefix of the root node.
pub const DEFAULT_ID_PREFIX: &str = "root";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The closed set of schema types the dispatcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Array,
    Boolean,
    Integer,
    Number,
    Object,
    String,
    Null,
}

impl SchemaType {
    /// Parse a `type` keyword value.
    ///
    /// Returns `None` for anything outside the JSON Schema primitive types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "array" => Some(SchemaType::Array),
            "boolean" => Some(SchemaType::Boolean),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "object" => Some(SchemaType::Object),
            "string" => Some(SchemaType::String),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    /// Read the type of a schema fragment.
    ///
    /// Only a single string `type` counts; type unions are not concrete.
    pub fn of(schema: &Value) -> Option<Self> {
        schema.get("type").and_then(Value::as_str).and_then(Self::parse)
    }
}

/// Human-readable label of a schema's `type`, used in reasons and class names.
///
/// Type unions are joined with commas; a missing type reads `unspecified`.
pub fn type_label(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .map(|t| match t {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(other) => other.to_string(),
        None => "unspecified".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_type_parse() {
        assert_eq!(SchemaType::parse("array"), Some(SchemaType::Array));
        assert_eq!(SchemaType::parse("integer"), Some(SchemaType::Integer));
        assert_eq!(SchemaType::parse("null"), Some(SchemaType::Null));
        assert_eq!(SchemaType::parse("date"), None);
        assert_eq!(SchemaType::parse(""), None);
    }

    #[test]
    fn schema_type_of_ignores_unions() {
        assert_eq!(
            SchemaType::of(&json!({ "type": "string" })),
            Some(SchemaType::String)
        );
        assert_eq!(SchemaType::of(&json!({ "type": ["string", "null"] })), None);
        assert_eq!(SchemaType::of(&json!({})), None);
    }

    #[test]
    fn type_label_variants() {
        assert_eq!(type_label(&json!({ "type": "object" })), "object");
        assert_eq!(
            type_label(&json!({ "type": ["string", "null"] })),
            "string,null"
        );
        assert_eq!(type_label(&json!({ "title": "x" })), "unspecified");
    }
}
