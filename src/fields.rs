//! Built-in field renderers and the default description and placeholder views.
//!
//! Scalar fields render a `widget` element naming the widget a host should
//! mount, with the current value and flags as attributes. Container fields
//! recurse through [`schema_field`] for every child.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::error_schema::ErrorSchema;
use crate::id_schema::{child_id, to_id_schema, IdSchema};
use crate::node::{Element, Node};
use crate::options::{is_files_array, is_multi_select, is_select};
use crate::registry::{DescriptionRenderer, Field, FieldProps, UnsupportedRenderer};
use crate::schema_field::{schema_field, SchemaFieldProps};

static NULL: Value = Value::Null;

const WILDCARD: &str = "*";

/// A widget placeholder carrying the field's value, flags and options.
fn widget(props: &FieldProps<'_>, field: &str, default_widget: &str) -> Element {
    let mut element = Element::new("widget")
        .id(props.id_schema.id.as_str())
        .attr("field", field)
        .attr(
            "widget",
            props.ui_schema.widget.as_deref().unwrap_or(default_widget),
        )
        .flag("required", props.required)
        .flag("disabled", props.disabled)
        .flag("readonly", props.read_only)
        .flag("autofocus", props.auto_focus);

    if !props.form_data.is_null() {
        element = element.attr("value", props.form_data.clone());
    }
    if let Some(options) = enum_options(props.schema) {
        element = element.attr("enumOptions", options);
    }
    if !props.ui_schema.options.is_empty() {
        let options: Map<String, Value> = props
            .ui_schema
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        element = element.attr("options", options);
    }
    element
}

/// `{label, value}` pairs of an enum, or of constant `oneOf`/`anyOf` alternatives.
fn enum_options(schema: &Value) -> Option<Vec<Value>> {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        let names = schema.get("enumNames").and_then(Value::as_array);
        let options = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let label = names
                    .and_then(|names| names.get(i))
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| display_value(value));
                option(label, value.clone())
            })
            .collect();
        return Some(options);
    }

    if !is_select(schema) {
        return None;
    }
    let alternatives = schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array)?;
    let options = alternatives
        .iter()
        .map(|alternative| {
            let value = alternative
                .get("const")
                .or_else(|| alternative.get("enum").and_then(|e| e.get(0)))
                .cloned()
                .unwrap_or(Value::Null);
            let label = alternative
                .get("title")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| display_value(&value));
            option(label, value)
        })
        .collect();
    Some(options)
}

fn option(label: String, value: Value) -> Value {
    let mut option = Map::new();
    option.insert("label".into(), Value::String(label));
    option.insert("value".into(), value);
    Value::Object(option)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn str_key<'a>(schema: &'a Value, key: &str) -> Option<&'a str> {
    schema.get(key).and_then(Value::as_str)
}

/// Renders strings: `select` for enums, a format widget, or `text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringField;

impl Field for StringField {
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        let default_widget = if is_select(props.schema) {
            "select"
        } else {
            match str_key(props.schema, "format") {
                Some("email") => "email",
                Some("uri") => "url",
                Some("data-url") => "file",
                Some("date") => "date",
                Some("date-time") => "datetime",
                Some("color") => "color",
                _ => "text",
            }
        };
        Ok(widget(props, "StringField", default_widget).into())
    }
}

/// Renders integers and numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberField;

impl Field for NumberField {
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        let default_widget = if is_select(props.schema) { "select" } else { "text" };
        Ok(widget(props, "NumberField", default_widget).into())
    }
}

/// Renders booleans as a checkbox carrying its own label.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanField;

impl Field for BooleanField {
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        let label = props
            .ui_schema
            .title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| str_key(props.schema, "title").filter(|s| !s.is_empty()))
            .unwrap_or(props.name);

        let mut element = widget(props, "BooleanField", "checkbox").attr("label", label);
        if !element.attrs.contains_key("enumOptions") {
            element = element.attr(
                "enumOptions",
                vec![
                    option("yes".into(), Value::Bool(true)),
                    option("no".into(), Value::Bool(false)),
                ],
            );
        }
        Ok(element.into())
    }
}

/// Renders nothing; a `null` value has no editable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullField;

impl Field for NullField {
    fn render(&self, _props: &FieldProps<'_>) -> Result<Node, RenderError> {
        Ok(Node::Empty)
    }
}

/// Order property names by a `ui:order` list.
///
/// Order entries naming no property are dropped. A single `*` stands for
/// every property the list does not name.
///
/// # Errors
///
/// Returns a message when properties are left out and no wildcard is
/// present, or when the list holds more than one wildcard.
pub fn order_properties(properties: &[String], order: Option<&[String]>) -> Result<Vec<String>, String> {
    let Some(order) = order else {
        return Ok(properties.to_vec());
    };

    let filtered: Vec<&String> = order
        .iter()
        .filter(|name| name.as_str() == WILDCARD || properties.contains(name))
        .collect();
    let rest: Vec<&String> = properties
        .iter()
        .filter(|name| !filtered.contains(name))
        .collect();

    let wildcards: Vec<usize> = filtered
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() == WILDCARD)
        .map(|(i, _)| i)
        .collect();

    match wildcards.as_slice() {
        [] if rest.is_empty() => Ok(filtered.into_iter().cloned().collect()),
        [] => {
            let list = if rest.len() > 1 {
                let names: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
                format!("properties '{}'", names.join("', '"))
            } else {
                format!("property '{}'", rest[0])
            };
            Err(format!("uiSchema order list does not contain {}", list))
        }
        [at] => {
            let mut complete: Vec<String> = filtered[..*at].iter().map(|s| s.to_string()).collect();
            complete.extend(rest.into_iter().cloned());
            complete.extend(filtered[at + 1..].iter().map(|s| s.to_string()));
            Ok(complete)
        }
        _ => Err("uiSchema order list contains more than one wildcard item".to_string()),
    }
}

/// Renders objects as a fieldset of their properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectField;

impl Field for ObjectField {
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        let id = props.id_schema.id.as_str();
        let properties = props.schema.get("properties").and_then(Value::as_object);
        let names: Vec<String> = properties
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();

        let ordered = match order_properties(&names, props.ui_schema.order.as_deref()) {
            Ok(ordered) => ordered,
            Err(message) => {
                log::warn!("{}: invalid ui:order: {}", id, message);
                return Ok(config_error(props, &message));
            }
        };

        let required: BTreeSet<&str> = props
            .schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let title = props
            .ui_schema
            .title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| str_key(props.schema, "title").filter(|s| !s.is_empty()))
            .unwrap_or(props.name);
        let description = props
            .ui_schema
            .description
            .as_deref()
            .or_else(|| str_key(props.schema, "description"));

        let mut fieldset = Element::new("fieldset").id(id);
        if !title.is_empty() {
            fieldset = fieldset.child(
                Element::new("legend")
                    .id(format!("{}__title", id))
                    .child(Node::text(title)),
            );
        }
        if let Some(description) = description {
            fieldset = fieldset.child(props.registry.description().render(
                &format!("{}__description", id),
                description,
                props.form_context,
            ));
        }

        for name in &ordered {
            let Some(schema) = properties.and_then(|p| p.get(name)) else {
                continue;
            };
            let id_schema = props.id_schema.child(name);
            let child = schema_field(&SchemaFieldProps {
                schema,
                ui_schema: props.ui_schema.child(name),
                id_schema: &id_schema,
                form_data: props.form_data.get(name).unwrap_or(&NULL),
                error_schema: ErrorSchema::child_of(props.errors, name),
                name,
                required: required.contains(name.as_str()),
                disabled: props.disabled,
                read_only: props.read_only,
                auto_focus: false,
                registry: props.registry,
                depth: props.depth + 1,
            })?;
            fieldset = fieldset.child(child);
        }

        Ok(fieldset.into())
    }
}

fn config_error(props: &FieldProps<'_>, message: &str) -> Node {
    let name = if props.name.is_empty() { "root" } else { props.name };
    let schema = serde_json::to_string(props.schema).unwrap_or_default();
    Element::new("div")
        .child(
            Element::new("p")
                .class("config-error")
                .child(Node::text(format!("Invalid {} object field configuration: ", name)))
                .child(Element::new("em").child(Node::text(message)))
                .child(Node::text(".")),
        )
        .child(Element::new("pre").child(Node::text(schema)))
        .into()
}

/// Renders arrays: one widget for multi-selects and file lists, one child per item otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayField;

impl Field for ArrayField {
    fn render(&self, props: &FieldProps<'_>) -> Result<Node, RenderError> {
        let Some(items) = props.schema.get("items") else {
            return Ok(props.registry.unsupported().render(
                props.schema,
                props.id_schema,
                "Missing items definition",
            ));
        };
        let resolver = props.registry.resolver();

        if is_multi_select(props.schema, &resolver) {
            let item_schema = resolver.resolve(items, &NULL)?;
            let mut element = widget(props, "ArrayField", "select").attr("multiple", true);
            if let Some(options) = enum_options(&item_schema) {
                element = element.attr("enumOptions", options);
            }
            return Ok(element.into());
        }
        if is_files_array(props.schema, props.ui_schema, &resolver) {
            return Ok(widget(props, "ArrayField", "files").attr("multiple", true).into());
        }

        let data: &[Value] = props
            .form_data
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut item_nodes = Vec::new();

        match items {
            Value::Array(fixed) => {
                let additional = props
                    .schema
                    .get("additionalItems")
                    .filter(|additional| additional.is_object());
                let count = match additional {
                    Some(_) => fixed.len().max(data.len()),
                    None => fixed.len(),
                };
                for index in 0..count {
                    let (item_schema, ui_key) = match fixed.get(index) {
                        Some(schema) => (schema, "items"),
                        None => match additional {
                            Some(schema) => (schema, "additionalItems"),
                            None => continue,
                        },
                    };
                    item_nodes.push(render_item(props, index, item_schema, ui_key, data)?);
                }
            }
            item_schema => {
                for index in 0..data.len() {
                    item_nodes.push(render_item(props, index, item_schema, "items", data)?);
                }
            }
        }

        let id = props.id_schema.id.as_str();
        let title = props
            .ui_schema
            .title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| str_key(props.schema, "title").filter(|s| !s.is_empty()))
            .unwrap_or(props.name);

        let mut fieldset = Element::new("fieldset").id(id).class("field-array");
        if !title.is_empty() {
            fieldset = fieldset.child(
                Element::new("legend")
                    .id(format!("{}__title", id))
                    .child(Node::text(title)),
            );
        }
        Ok(fieldset
            .child(Element::new("div").class("array-item-list").children(item_nodes))
            .into())
    }
}

fn render_item(
    props: &FieldProps<'_>,
    index: usize,
    item_schema: &Value,
    ui_key: &str,
    data: &[Value],
) -> Result<Node, RenderError> {
    let key = index.to_string();
    let item_data = data.get(index).unwrap_or(&NULL);
    let item_id = child_id(&props.id_schema.id, &key);
    let id_schema: IdSchema = to_id_schema(
        item_schema,
        &item_id,
        &props.registry.resolver(),
        item_data,
    )?;

    let child = schema_field(&SchemaFieldProps {
        schema: item_schema,
        ui_schema: props.ui_schema.child(ui_key),
        id_schema: &id_schema,
        form_data: item_data,
        error_schema: ErrorSchema::child_of(props.errors, &key),
        name: "",
        required: is_item_required(item_schema),
        disabled: props.disabled,
        read_only: props.read_only,
        auto_focus: props.auto_focus && index == 0,
        registry: props.registry,
        depth: props.depth + 1,
    })?;

    Ok(Element::new("div").class("array-item").child(child).into())
}

/// An item is required unless its type admits `null`.
fn is_item_required(item_schema: &Value) -> bool {
    match item_schema.get("type") {
        Some(Value::Array(types)) => !types.iter().any(|t| t == "null"),
        Some(t) => t != "null",
        None => true,
    }
}

/// Renders descriptions as a paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDescription;

impl DescriptionRenderer for DefaultDescription {
    fn render(&self, id: &str, description: &str, _form_context: &Value) -> Node {
        if description.is_empty() {
            return Node::Empty;
        }
        Element::new("p")
            .id(id)
            .class("field-description")
            .child(Node::text(description))
            .into()
    }
}

/// Renders the placeholder for schemas no field handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUnsupported;

impl UnsupportedRenderer for DefaultUnsupported {
    fn render(&self, schema: &Value, id_schema: &IdSchema, reason: &str) -> Node {
        let mut message = String::from("Unsupported field schema");
        if !id_schema.id.is_empty() {
            message.push_str(&format!(" for field `{}`", id_schema.id));
        }
        if !reason.is_empty() {
            message.push_str(&format!(": {}", reason));
        }
        message.push('.');

        let pretty = serde_json::to_string_pretty(schema).unwrap_or_default();
        Element::new("div")
            .class("unsupported-field")
            .child(Element::new("p").child(Node::text(message)))
            .child(Element::new("pre").child(Node::text(pretty)))
            .into()
    }
}
