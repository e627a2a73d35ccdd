//! The orchestrator - composes one schema node and, through its field, the subtree below it.
//!
//! For every node: resolve the schema, dispatch a renderer, merge display
//! options, split the error tree, render the body and hand everything to
//! the registry's template.

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::dispatch;
use crate::error::RenderError;
use crate::error_schema::ErrorSchema;
use crate::id_schema::{to_id_schema, IdSchema};
use crate::node::Node;
use crate::options::{self, FieldFlags};
use crate::registry::{FieldProps, Registry};
use crate::template::{errors_view, help_view, TemplateParts};
use crate::types::DEFAULT_ID_PREFIX;
use crate::ui_schema::UiSchema;

/// Borrowed inputs of one orchestrator step.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFieldProps<'a> {
    pub schema: &'a Value,
    pub ui_schema: &'a UiSchema,
    pub id_schema: &'a IdSchema,
    pub form_data: &'a Value,
    pub error_schema: &'a ErrorSchema,
    pub name: &'a str,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
    pub registry: &'a Registry,
    pub depth: usize,
}

/// Compose one schema node.
///
/// A schema with no keywords renders nothing.
///
/// # Errors
///
/// Returns `RenderError::Resolve` when a reference in the subtree cannot be
/// resolved, `RenderError::DepthExceeded` when nesting passes the registry's
/// limit, and whatever a host renderer returns.
pub fn schema_field(props: &SchemaFieldProps<'_>) -> Result<Node, RenderError> {
    let registry = props.registry;
    let id = props.id_schema.id.as_str();

    if props.depth > registry.max_depth() {
        return Err(RenderError::DepthExceeded {
            id: id.to_string(),
            limit: registry.max_depth(),
        });
    }

    let resolver = registry.resolver();
    let schema = resolver.resolve(props.schema, props.form_data)?;
    if schema.as_object().map_or(true, |keywords| keywords.is_empty()) {
        return Ok(Node::Empty);
    }

    let handle = dispatch(&schema, props.ui_schema, registry);
    if handle.is_unsupported() {
        log::warn!("{}: no field renderer for {}", id, schema);
    } else {
        log::debug!("{}: dispatched to {}", id, handle.name());
    }

    let flags = FieldFlags {
        disabled: props.disabled,
        read_only: props.read_only,
        auto_focus: props.auto_focus,
    };
    let display = options::merge(
        props.ui_schema,
        &schema,
        props.schema,
        props.name,
        flags,
        &resolver,
    );
    let projection = props.error_schema.project();

    let body_ui = props.ui_schema.without_class_names();
    let body = handle.render(&FieldProps {
        schema: &schema,
        ui_schema: &body_ui,
        id_schema: props.id_schema,
        form_data: props.form_data,
        errors: projection.children,
        name: props.name,
        required: props.required,
        disabled: display.disabled,
        read_only: display.read_only,
        auto_focus: display.auto_focus,
        registry,
        form_context: registry.form_context(),
        depth: props.depth,
    })?;

    let description = match display.description.as_deref() {
        Some(text) => registry.description().render(
            &format!("{}__description", id),
            text,
            registry.form_context(),
        ),
        None => Node::Empty,
    };

    Ok(registry.template().compose(TemplateParts {
        id,
        class_names: &display.class_names,
        label: &display.label,
        body,
        errors: errors_view(projection.own_errors),
        raw_errors: projection.own_errors,
        contains_errors: projection.contains_errors(),
        help: help_view(display.help.as_deref()),
        raw_help: display.help.as_deref(),
        description,
        raw_description: display.description.as_deref(),
        hidden: display.hidden,
        required: props.required,
        disabled: display.disabled,
        read_only: display.read_only,
        display_label: display.display_label,
        schema: &schema,
        ui_schema: props.ui_schema,
        form_context: registry.form_context(),
    }))
}

/// Owned inputs of a top-level render.
///
/// These are the snapshots compared by [`crate::should_recompose`].
#[derive(Debug, Clone)]
pub struct FormInputs {
    pub schema: Value,
    pub ui_schema: UiSchema,
    pub form_data: Value,
    pub error_schema: ErrorSchema,
    /// Precomputed identities. Derived from the schema when absent.
    pub id_schema: Option<IdSchema>,
    pub name: String,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
    pub registry: Arc<Registry>,
}

impl FormInputs {
    pub fn new(schema: Value, registry: Arc<Registry>) -> Self {
        Self {
            schema,
            ui_schema: UiSchema::default(),
            form_data: Value::Null,
            error_schema: ErrorSchema::default(),
            id_schema: None,
            name: String::new(),
            required: false,
            disabled: false,
            read_only: false,
            auto_focus: false,
            registry,
        }
    }

    pub fn ui_schema(mut self, ui_schema: UiSchema) -> Self {
        self.ui_schema = ui_schema;
        self
    }

    pub fn form_data(mut self, form_data: Value) -> Self {
        self.form_data = form_data;
        self
    }

    pub fn error_schema(mut self, error_schema: ErrorSchema) -> Self {
        self.error_schema = error_schema;
        self
    }

    pub fn id_schema(mut self, id_schema: IdSchema) -> Self {
        self.id_schema = Some(id_schema);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn auto_focus(mut self, auto_focus: bool) -> Self {
        self.auto_focus = auto_focus;
        self
    }
}

/// Render a whole form.
///
/// # Errors
///
/// Returns `RenderError` as [`schema_field`] does, and when the identity
/// schema cannot be derived.
pub fn render(inputs: &FormInputs) -> Result<Node, RenderError> {
    let registry = inputs.registry.as_ref();
    let derived;
    let id_schema = match &inputs.id_schema {
        Some(id_schema) => id_schema,
        None => {
            derived = to_id_schema(
                &inputs.schema,
                DEFAULT_ID_PREFIX,
                &registry.resolver(),
                &inputs.form_data,
            )?;
            &derived
        }
    };

    schema_field(&SchemaFieldProps {
        schema: &inputs.schema,
        ui_schema: &inputs.ui_schema,
        id_schema,
        form_data: &inputs.form_data,
        error_schema: &inputs.error_schema,
        name: &inputs.name,
        required: inputs.required,
        disabled: inputs.disabled,
        read_only: inputs.read_only,
        auto_focus: inputs.auto_focus,
        registry,
        depth: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::field_fn;
    use serde_json::json;

    fn render_schema(schema: Value) -> Node {
        render(&FormInputs::new(schema, Arc::new(Registry::default()))).unwrap()
    }

    #[test]
    fn string_field_gets_label_and_widget() {
        let node = render_schema(json!({ "type": "string", "title": "Name" }));

        let root = node.find_by_id("root").unwrap();
        assert!(root.has_class("field-string"));
        assert!(!root.has_class("error"));
        assert_eq!(node.find(&|e| e.tag == "label").unwrap().children, [Node::text("Name")]);
        assert!(node.find(&|e| e.tag == "widget").is_some());
    }

    #[test]
    fn empty_schema_renders_nothing() {
        assert_eq!(render_schema(json!({})), Node::Empty);
        assert_eq!(render_schema(json!(true)), Node::Empty);
    }

    #[test]
    fn unresolved_reference_aborts() {
        let inputs = FormInputs::new(
            json!({ "$ref": "#/definitions/missing" }),
            Arc::new(Registry::default()),
        )
        .id_schema(IdSchema::new("root"));

        let err = render(&inputs).unwrap_err();
        assert!(err.to_string().contains("#/definitions/missing"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn reference_siblings_label_the_field() {
        let mut definitions = serde_json::Map::new();
        definitions.insert("name".into(), json!({ "type": "string", "title": "Type title" }));
        let registry = Registry::builder().definitions(definitions).build();

        let inputs = FormInputs::new(
            json!({ "$ref": "#/definitions/name", "title": "Field title" }),
            Arc::new(registry),
        );
        let node = render(&inputs).unwrap();
        let label = node.find(&|e| e.tag == "label").unwrap();
        assert_eq!(label.children, [Node::text("Field title")]);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let registry = Registry::builder().max_depth(1).build();
        let inputs = FormInputs::new(
            json!({
                "type": "object",
                "properties": {
                    "a": {
                        "type": "object",
                        "properties": { "b": { "type": "string" } }
                    }
                }
            }),
            Arc::new(registry),
        );

        let err = render(&inputs).unwrap_err();
        assert!(matches!(
            err,
            RenderError::DepthExceeded { ref id, limit: 1 } if id == "root_a_b"
        ));
    }

    #[test]
    fn body_overlay_has_no_class_names() {
        let registry = Registry::builder()
            .field(
                "Probe",
                field_fn(|props| {
                    Ok(Node::text(
                        props.ui_schema.class_names.as_deref().unwrap_or("none"),
                    ))
                }),
            )
            .build();
        let inputs = FormInputs::new(json!({ "type": "string" }), Arc::new(registry)).ui_schema(
            UiSchema::from_value(&json!({ "ui:field": "Probe", "classNames": "wide" })),
        );

        let node = render(&inputs).unwrap();
        assert!(node.find_by_id("root").unwrap().has_class("wide"));
        assert_eq!(node.text_content(), "none");
    }

    #[test]
    fn explicit_flags_reach_the_widget() {
        let inputs = FormInputs::new(json!({ "type": "string" }), Arc::new(Registry::default()))
            .disabled(true)
            .required(true);

        let node = render(&inputs).unwrap();
        let widget = node.find(&|e| e.tag == "widget").unwrap();
        assert_eq!(widget.attrs["disabled"], json!(true));
        assert_eq!(widget.attrs["required"], json!(true));
        assert!(node.find_by_id("root").unwrap().has_class("required"));
    }
}
