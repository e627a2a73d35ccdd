//! Display options - merges overlay directives with schema metadata.
//!
//! Every option follows a fixed precedence. The `display_label` flag is an
//! ordered cascade: it starts from the overlay's `label` option and each rule
//! may override the value the previous rules produced.
//!
//! | Condition | `display_label` |
//! |-----------|-----------------|
//! | `type` is `array` | multi-select or file array |
//! | `type` is `object` | `false` |
//! | `type` is `boolean` without `ui:widget` | `false` |
//! | `ui:field` override present | `false` |
//! | otherwise | `ui:options.label`, default `true` |

use std::borrow::Cow;

use serde_json::Value;

use crate::resolver::SchemaResolver;
use crate::types::{type_label, SchemaType};
use crate::ui_schema::UiSchema;

/// Flags passed explicitly by the caller. They win over overlay directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
}

/// Display options of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
    pub label: String,
    pub description: Option<String>,
    pub help: Option<String>,
    pub hidden: bool,
    pub display_label: bool,
    /// `field-<type>` followed by the overlay's class names.
    pub class_names: String,
}

/// Inputs of the `display_label` cascade.
#[derive(Debug, Clone, Copy)]
pub struct LabelContext<'a> {
    pub schema: &'a Value,
    pub ui_schema: &'a UiSchema,
    pub resolver: &'a SchemaResolver<'a>,
}

type LabelRule = fn(bool, &LabelContext<'_>) -> bool;

/// Rules of the cascade, applied in this order.
const DISPLAY_LABEL_RULES: &[LabelRule] = &[
    array_label,
    object_label,
    boolean_label,
    field_override_label,
];

fn array_label(current: bool, ctx: &LabelContext<'_>) -> bool {
    if SchemaType::of(ctx.schema) == Some(SchemaType::Array) {
        is_multi_select(ctx.schema, ctx.resolver)
            || is_files_array(ctx.schema, ctx.ui_schema, ctx.resolver)
    } else {
        current
    }
}

fn object_label(current: bool, ctx: &LabelContext<'_>) -> bool {
    current && SchemaType::of(ctx.schema) != Some(SchemaType::Object)
}

fn boolean_label(current: bool, ctx: &LabelContext<'_>) -> bool {
    let unstyled_boolean =
        SchemaType::of(ctx.schema) == Some(SchemaType::Boolean) && ctx.ui_schema.widget.is_none();
    current && !unstyled_boolean
}

fn field_override_label(current: bool, ctx: &LabelContext<'_>) -> bool {
    current && ctx.ui_schema.field.is_none()
}

/// Whether a field shows its label.
pub fn display_label(ctx: &LabelContext<'_>) -> bool {
    let initial = ctx.ui_schema.label_option().unwrap_or(true);
    DISPLAY_LABEL_RULES
        .iter()
        .fold(initial, |current, rule| rule(current, ctx))
}

/// Merge overlay directives, explicit flags and schema metadata.
///
/// `schema` is the resolved schema and `raw_schema` the fragment before
/// resolution; the raw fragment's title and description win, since a
/// reference's siblings describe the field while the definition describes the type.
pub fn merge(
    ui_schema: &UiSchema,
    schema: &Value,
    raw_schema: &Value,
    name: &str,
    flags: FieldFlags,
    resolver: &SchemaResolver<'_>,
) -> DisplayOptions {
    // Empty strings fall through to the next candidate
    let label = non_empty(ui_schema.title.as_deref())
        .or_else(|| non_empty(str_key(raw_schema, "title")))
        .or_else(|| non_empty(str_key(schema, "title")))
        .unwrap_or(name)
        .to_string();

    let description = non_empty(ui_schema.description.as_deref())
        .or_else(|| non_empty(str_key(raw_schema, "description")))
        .or_else(|| non_empty(str_key(schema, "description")))
        .map(String::from);

    DisplayOptions {
        disabled: flags.disabled || ui_schema.disabled,
        read_only: flags.read_only || ui_schema.read_only,
        auto_focus: flags.auto_focus || ui_schema.auto_focus,
        label,
        description,
        help: ui_schema.help.clone(),
        hidden: ui_schema.is_hidden(),
        display_label: display_label(&LabelContext {
            schema,
            ui_schema,
            resolver,
        }),
        class_names: class_names(schema, ui_schema),
    }
}

/// `field-<type>` joined with the overlay's class names.
pub fn class_names(schema: &Value, ui_schema: &UiSchema) -> String {
    let type_class = format!("field-{}", type_label(schema));
    let extra = ui_schema.class_names.as_deref().unwrap_or("");
    format!("{} {}", type_class, extra).trim().to_string()
}

/// An array of unique items chosen from a fixed set of values.
pub fn is_multi_select(schema: &Value, resolver: &SchemaResolver<'_>) -> bool {
    let unique = schema
        .get("uniqueItems")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !unique {
        return false;
    }
    match schema.get("items") {
        Some(items) => is_select(&resolve_items(items, resolver)),
        None => false,
    }
}

/// An array edited through a file picker.
pub fn is_files_array(schema: &Value, ui_schema: &UiSchema, resolver: &SchemaResolver<'_>) -> bool {
    if ui_schema.widget.as_deref() == Some("files") {
        return true;
    }
    match schema.get("items") {
        Some(items) => {
            let items = resolve_items(items, resolver);
            str_key(&items, "type") == Some("string") && str_key(&items, "format") == Some("data-url")
        }
        None => false,
    }
}

/// A schema whose values come from a fixed list.
pub fn is_select(schema: &Value) -> bool {
    if schema.get("enum").map_or(false, Value::is_array) {
        return true;
    }
    match schema.get("oneOf").or_else(|| schema.get("anyOf")) {
        Some(Value::Array(alternatives)) => alternatives.iter().all(is_constant),
        _ => false,
    }
}

/// A schema that admits exactly one value.
pub fn is_constant(schema: &Value) -> bool {
    let single_enum = schema
        .get("enum")
        .and_then(Value::as_array)
        .map_or(false, |values| values.len() == 1);
    single_enum || schema.get("const").is_some()
}

fn resolve_items<'a>(items: &'a Value, resolver: &SchemaResolver<'_>) -> Cow<'a, Value> {
    // A broken item reference surfaces when the items render
    resolver
        .resolve(items, &Value::Null)
        .unwrap_or(Cow::Borrowed(items))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn str_key<'a>(schema: &'a Value, key: &str) -> Option<&'a str> {
    schema.get(key).and_then(Value::as_str)
}
