//! Field dispatch - picks the renderer for a concrete schema.
//!
//! Resolution order, first match wins:
//!
//! | Source | Result |
//! |--------|--------|
//! | `ui:field` set to a host renderer | that renderer |
//! | `ui:field` naming a registered field | the registered field |
//! | schema `type` | `ArrayField`, `BooleanField`, `NumberField`, `ObjectField`, `StringField` |
//! | anything else | unsupported placeholder with a reason |
//!
//! Dispatch never fails: a schema nothing handles still renders, as a
//! placeholder explaining why.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RenderError;
use crate::node::Node;
use crate::registry::{Field, FieldProps, Registry};
use crate::types::{type_label, SchemaType};
use crate::ui_schema::{FieldOverride, UiSchema};

/// Registry name of the renderer for a schema type.
pub fn component_name(schema_type: SchemaType) -> Option<&'static str> {
    match schema_type {
        SchemaType::Array => Some("ArrayField"),
        SchemaType::Boolean => Some("BooleanField"),
        SchemaType::Integer | SchemaType::Number => Some("NumberField"),
        SchemaType::Object => Some("ObjectField"),
        SchemaType::String => Some("StringField"),
        SchemaType::Null => None,
    }
}

/// The renderer chosen for a node.
#[derive(Clone)]
pub enum FieldHandle {
    /// Renderer supplied in the overlay.
    Override(Arc<dyn Field>),
    /// Registered renderer named by the overlay.
    Named { name: String, field: Arc<dyn Field> },
    /// Registered renderer for the schema type.
    Typed {
        name: &'static str,
        field: Arc<dyn Field>,
    },
    /// No renderer handles the schema.
    Unsupported { reason: String },
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldHandle::Override(_) => f.write_str("Override(..)"),
            FieldHandle::Named { name, .. } => f.debug_struct("Named").field("name", name).finish(),
            FieldHandle::Typed { name, .. } => f.debug_struct("Typed").field("name", name).finish(),
            FieldHandle::Unsupported { reason } => f
                .debug_struct("Unsupported")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl FieldHandle {
    /// Name of the chosen renderer, for diagnostics.
    pub fn name(&self) -> &str {
        match self {
            FieldHandle::Override(_) => "custom",
            FieldHandle::Named { name, .. } => name,
            FieldHandle::Typed { name, .. } => name,
            FieldHandle::Unsupported { .. } => "UnsupportedField",
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, FieldHandle::Unsupported { .. })
    }

    /// Render the field body through the chosen renderer.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's `RenderError`. The unsupported placeholder never fails.
    pub fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        match self {
            FieldHandle::Override(field)
            | FieldHandle::Named { field, .. }
            | FieldHandle::Typed { field, .. } => field.render(props),
            FieldHandle::Unsupported { reason } => Ok(props
                .registry
                .unsupported()
                .render(props.schema, props.id_schema, reason)),
        }
    }
}

/// Choose the renderer for a concrete schema.
pub fn dispatch(schema: &Value, ui_schema: &UiSchema, registry: &Registry) -> FieldHandle {
    match &ui_schema.field {
        Some(FieldOverride::Custom(field)) => return FieldHandle::Override(Arc::clone(field)),
        Some(FieldOverride::Named(name)) => {
            if let Some(field) = registry.field(name) {
                return FieldHandle::Named {
                    name: name.clone(),
                    field: Arc::clone(field),
                };
            }
            log::debug!("ui:field '{}' is not registered, dispatching by type", name);
        }
        Some(FieldOverride::Opaque(value)) => {
            log::debug!("ui:field {} names no renderer, dispatching by type", value);
        }
        None => {}
    }

    let typed = SchemaType::of(schema)
        .and_then(component_name)
        .and_then(|name| registry.field(name).map(|field| (name, field)));

    match typed {
        Some((name, field)) => FieldHandle::Typed {
            name,
            field: Arc::clone(field),
        },
        None => FieldHandle::Unsupported {
            reason: format!("Unknown field type {}", type_label(schema)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::field_fn;
    use serde_json::json;

    fn names(schema: Value, ui: &UiSchema, registry: &Registry) -> String {
        dispatch(&schema, ui, registry).name().to_string()
    }

    #[test]
    fn dispatch_by_type() {
        let registry = Registry::default();
        let ui = UiSchema::default();

        assert_eq!(names(json!({ "type": "array" }), &ui, &registry), "ArrayField");
        assert_eq!(names(json!({ "type": "boolean" }), &ui, &registry), "BooleanField");
        assert_eq!(names(json!({ "type": "integer" }), &ui, &registry), "NumberField");
        assert_eq!(names(json!({ "type": "number" }), &ui, &registry), "NumberField");
        assert_eq!(names(json!({ "type": "object" }), &ui, &registry), "ObjectField");
        assert_eq!(names(json!({ "type": "string" }), &ui, &registry), "StringField");
    }

    #[test]
    fn unknown_type_is_unsupported_with_reason() {
        let registry = Registry::default();
        let ui = UiSchema::default();

        let handle = dispatch(&json!({ "type": "date" }), &ui, &registry);
        assert!(matches!(
            &handle,
            FieldHandle::Unsupported { reason } if reason == "Unknown field type date"
        ));

        let handle = dispatch(&json!({ "title": "no type" }), &ui, &registry);
        assert!(matches!(
            &handle,
            FieldHandle::Unsupported { reason } if reason == "Unknown field type unspecified"
        ));

        let handle = dispatch(&json!({ "type": "null" }), &ui, &registry);
        assert!(handle.is_unsupported());
    }

    #[test]
    fn named_override_wins_over_type() {
        let registry = Registry::default();
        let ui = UiSchema::default().with_field_name("BooleanField");

        assert_eq!(names(json!({ "type": "string" }), &ui, &registry), "BooleanField");
    }

    #[test]
    fn unregistered_name_falls_back_to_type() {
        let registry = Registry::default();
        let ui = UiSchema::default().with_field_name("GeoField");

        assert_eq!(names(json!({ "type": "string" }), &ui, &registry), "StringField");
    }

    #[test]
    fn opaque_override_dispatches_by_type() {
        let registry = Registry::default();
        let ui = UiSchema::from_value(&json!({ "ui:field": { "component": "geo" } }));

        assert_eq!(names(json!({ "type": "string" }), &ui, &registry), "StringField");
    }

    #[test]
    fn custom_override_wins_over_everything() {
        let registry = Registry::default();
        let ui = UiSchema::default().with_field(Arc::new(field_fn(|_| Ok(Node::text("custom")))));

        let handle = dispatch(&json!({ "type": "nonsense" }), &ui, &registry);
        assert!(matches!(handle, FieldHandle::Override(_)));
    }

    #[test]
    fn missing_registry_entry_is_unsupported() {
        let registry = Registry::builder().without_field("StringField").build();
        let ui = UiSchema::default();

        let handle = dispatch(&json!({ "type": "string" }), &ui, &registry);
        assert!(matches!(
            &handle,
            FieldHandle::Unsupported { reason } if reason == "Unknown field type string"
        ));
    }
}
