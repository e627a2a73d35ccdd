//! Field registry - the renderer capabilities and configuration of a render pass.
//!
//! A `Registry` is an immutable snapshot: it is built once, shared by
//! reference through the whole recursive composition, and never mutated
//! while a tree is being composed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::error_schema::ErrorSchema;
use crate::fields::{
    ArrayField, BooleanField, DefaultDescription, DefaultUnsupported, NullField, NumberField,
    ObjectField, StringField,
};
use crate::id_schema::IdSchema;
use crate::node::Node;
use crate::resolver::{BranchMatcher, JsonSchemaMatcher, SchemaResolver};
use crate::template::{DefaultTemplate, FieldTemplate};
use crate::ui_schema::UiSchema;

/// Recursion limit for schema nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Inputs handed to a field renderer after dispatch.
///
/// `schema` is already concrete, `ui_schema` no longer carries the class
/// names the template consumed, and `errors` holds only descendant errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldProps<'a> {
    pub schema: &'a Value,
    pub ui_schema: &'a UiSchema,
    pub id_schema: &'a IdSchema,
    pub form_data: &'a Value,
    pub errors: &'a BTreeMap<String, ErrorSchema>,
    pub name: &'a str,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
    pub registry: &'a Registry,
    pub form_context: &'a Value,
    /// Nesting depth of this node, 0 at the root.
    pub depth: usize,
}

/// A renderer for one kind of field.
///
/// Renderers of container types re-enter [`crate::schema_field`] for their
/// children. Plain functions and closures with the right signature are fields.
pub trait Field: Send + Sync {
    /// Render the body of a field.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` when the subtree cannot be composed.
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError>;
}

impl<F> Field for F
where
    F: Fn(&FieldProps<'_>) -> Result<Node, RenderError> + Send + Sync,
{
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        self(props)
    }
}

/// Pin a closure's signature so it can be registered as a [`Field`].
pub fn field_fn<F>(f: F) -> F
where
    F: Fn(&FieldProps<'_>) -> Result<Node, RenderError> + Send + Sync,
{
    f
}

/// Renders a field description.
pub trait DescriptionRenderer: Send + Sync {
    fn render(&self, id: &str, description: &str, form_context: &Value) -> Node;
}

/// Renders the placeholder for a schema no field renderer handles.
pub trait UnsupportedRenderer: Send + Sync {
    fn render(&self, schema: &Value, id_schema: &IdSchema, reason: &str) -> Node;
}

/// Renderer capabilities and settings for one composition pass.
pub struct Registry {
    fields: HashMap<String, Arc<dyn Field>>,
    definitions: Map<String, Value>,
    form_context: Value,
    template: Arc<dyn FieldTemplate>,
    description: Arc<dyn DescriptionRenderer>,
    unsupported: Arc<dyn UnsupportedRenderer>,
    matcher: Arc<dyn BranchMatcher>,
    max_depth: usize,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("Registry")
            .field("fields", &fields)
            .field("definitions", &self.definitions.len())
            .field("form_context", &self.form_context)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builder().build()
    }
}

impl Registry {
    /// Start from the built-in fields and default renderers.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a field renderer by name.
    pub fn field(&self, name: &str) -> Option<&Arc<dyn Field>> {
        self.fields.get(name)
    }

    pub fn definitions(&self) -> &Map<String, Value> {
        &self.definitions
    }

    /// Opaque host value passed through to every renderer.
    pub fn form_context(&self) -> &Value {
        &self.form_context
    }

    pub fn template(&self) -> &dyn FieldTemplate {
        self.template.as_ref()
    }

    pub fn description(&self) -> &dyn DescriptionRenderer {
        self.description.as_ref()
    }

    pub fn unsupported(&self) -> &dyn UnsupportedRenderer {
        self.unsupported.as_ref()
    }

    /// A resolver over this registry's definitions and branch matcher.
    pub fn resolver(&self) -> SchemaResolver<'_> {
        SchemaResolver::new(&self.definitions).with_matcher(self.matcher.as_ref())
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Builder for [`Registry`].
pub struct RegistryBuilder {
    registry: Registry,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegistryBuilder").field(&self.registry).finish()
    }
}

impl RegistryBuilder {
    fn new() -> Self {
        let mut fields: HashMap<String, Arc<dyn Field>> = HashMap::new();
        fields.insert("ArrayField".into(), Arc::new(ArrayField));
        fields.insert("BooleanField".into(), Arc::new(BooleanField));
        fields.insert("NullField".into(), Arc::new(NullField));
        fields.insert("NumberField".into(), Arc::new(NumberField));
        fields.insert("ObjectField".into(), Arc::new(ObjectField));
        fields.insert("StringField".into(), Arc::new(StringField));

        Self {
            registry: Registry {
                fields,
                definitions: Map::new(),
                form_context: Value::Null,
                template: Arc::new(DefaultTemplate),
                description: Arc::new(DefaultDescription),
                unsupported: Arc::new(DefaultUnsupported),
                matcher: Arc::new(JsonSchemaMatcher),
                max_depth: DEFAULT_MAX_DEPTH,
            },
        }
    }

    /// Register (or replace) a field renderer under `name`.
    pub fn field(self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.field_arc(name, Arc::new(field))
    }

    pub fn field_arc(mut self, name: impl Into<String>, field: Arc<dyn Field>) -> Self {
        self.registry.fields.insert(name.into(), field);
        self
    }

    /// Remove a field renderer, so schemas dispatched to it degrade to a placeholder.
    pub fn without_field(mut self, name: &str) -> Self {
        self.registry.fields.remove(name);
        self
    }

    pub fn definitions(mut self, definitions: Map<String, Value>) -> Self {
        self.registry.definitions = definitions;
        self
    }

    pub fn form_context(mut self, form_context: Value) -> Self {
        self.registry.form_context = form_context;
        self
    }

    pub fn template(mut self, template: impl FieldTemplate + 'static) -> Self {
        self.registry.template = Arc::new(template);
        self
    }

    pub fn description_renderer(mut self, renderer: impl DescriptionRenderer + 'static) -> Self {
        self.registry.description = Arc::new(renderer);
        self
    }

    pub fn unsupported_renderer(mut self, renderer: impl UnsupportedRenderer + 'static) -> Self {
        self.registry.unsupported = Arc::new(renderer);
        self
    }

    pub fn branch_matcher(mut self, matcher: impl BranchMatcher + 'static) -> Self {
        self.registry.matcher = Arc::new(matcher);
        self
    }

    /// Set the recursion limit. Deeper schemas fail with `RenderError::DepthExceeded`.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.registry.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
