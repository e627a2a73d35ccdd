//! Schema Form
//!
//! Schema-to-field dispatch and composition for JSON Schema driven forms.
//!
//! Given a data schema, an optional UI-schema overlay, the current form data
//! and a pre-computed validation error tree, this library composes a tree of
//! renderable [`Node`]s. Actual widgets are external: scalar fields render a
//! `widget` placeholder naming the widget to mount.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use schema_form::{render, ErrorSchema, FormInputs, Registry};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "age": { "type": "integer", "title": "Age" }
//!     }
//! });
//! let errors = ErrorSchema::default().child("age", ErrorSchema::with_errors(["must be >= 0"]));
//!
//! let inputs = FormInputs::new(schema, Arc::new(Registry::default()))
//!     .form_data(json!({ "age": -1 }))
//!     .error_schema(errors);
//! let node = render(&inputs).unwrap();
//!
//! let age = node.find_by_id("root_age").unwrap();
//! assert!(age.has_class("error"));
//! ```
//!
//! # Composition
//!
//! | Step | Module |
//! |------|--------|
//! | Resolve `$ref` and `dependencies` | [`SchemaResolver`] |
//! | Pick a renderer | [`dispatch()`] |
//! | Merge display options | [`merge`] |
//! | Split the error tree | [`ErrorSchema::project`] |
//! | Compose label, description, body, errors, help | [`FieldTemplate`] |
//! | Skip unchanged renders | [`should_recompose`] |

mod dispatch;
mod error;
mod error_schema;
mod fields;
mod gate;
mod id_schema;
mod loader;
mod node;
mod options;
mod registry;
mod resolver;
mod schema_field;
mod template;
mod types;
mod ui_schema;

pub use dispatch::{component_name, dispatch, FieldHandle};
pub use error::{RenderError, ResolveError};
pub use error_schema::{ErrorEntry, ErrorSchema, Projection};
pub use fields::{
    order_properties, ArrayField, BooleanField, DefaultDescription, DefaultUnsupported, NullField,
    NumberField, ObjectField, StringField,
};
pub use gate::{should_recompose, MemoizedForm};
pub use id_schema::{child_id, to_id_schema, IdSchema};
pub use loader::{
    parse_document, read_document, read_error_schema, read_optional, read_ui_schema,
    FormDocuments, FormFiles,
};
pub use node::{Element, Node};
pub use options::{
    class_names, display_label, is_constant, is_files_array, is_multi_select, is_select, merge,
    DisplayOptions, FieldFlags, LabelContext,
};
pub use registry::{
    field_fn, DescriptionRenderer, Field, FieldProps, Registry, RegistryBuilder,
    UnsupportedRenderer, DEFAULT_MAX_DEPTH,
};
pub use resolver::{definitions_of, BranchMatcher, JsonSchemaMatcher, SchemaResolver};
pub use schema_field::{render, schema_field, FormInputs, SchemaFieldProps};
pub use template::{error_list, errors_view, help_view, DefaultTemplate, FieldTemplate, TemplateParts};
pub use types::{type_label, SchemaType, DEFAULT_ID_PREFIX};
pub use ui_schema::{FieldOverride, UiSchema};
