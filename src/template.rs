//! Field templates - compose label, description, body, errors and help.
//!
//! The composition order is fixed: label, description, body, own errors,
//! help. Label and description only appear when the field displays a label.
//! Hidden fields render their body with no chrome at all.

use serde_json::Value;

use crate::error_schema::ErrorEntry;
use crate::node::{Element, Node};
use crate::ui_schema::UiSchema;

/// Everything a template needs to compose one field.
#[derive(Debug, Clone)]
pub struct TemplateParts<'a> {
    pub id: &'a str,
    pub class_names: &'a str,
    pub label: &'a str,
    /// The rendered field body.
    pub body: Node,
    /// The rendered own-error view.
    pub errors: Node,
    pub raw_errors: &'a [String],
    pub contains_errors: bool,
    /// The rendered help view.
    pub help: Node,
    pub raw_help: Option<&'a str>,
    /// The rendered description.
    pub description: Node,
    pub raw_description: Option<&'a str>,
    pub hidden: bool,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub display_label: bool,
    pub schema: &'a Value,
    pub ui_schema: &'a UiSchema,
    pub form_context: &'a Value,
}

/// Composes the parts of a field into one renderable node.
///
/// Replacement templates must keep the default order and display gates.
pub trait FieldTemplate: Send + Sync {
    fn compose(&self, parts: TemplateParts<'_>) -> Node;
}

/// The stock field template.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplate;

impl FieldTemplate for DefaultTemplate {
    fn compose(&self, parts: TemplateParts<'_>) -> Node {
        if parts.hidden {
            return parts.body;
        }

        let mut classes = vec!["field", parts.class_names];
        if parts.required {
            classes.push("required");
        }
        if parts.contains_errors {
            classes.push("error");
        }

        let label = if parts.display_label {
            Node::from(
                Element::new("label")
                    .attr("for", parts.id)
                    .child(Node::text(parts.label)),
            )
        } else {
            Node::Empty
        };

        let description = if parts.display_label && parts.raw_description.is_some() {
            parts.description
        } else {
            Node::Empty
        };

        Element::new("div")
            .id(parts.id)
            .class(classes.join(" ").trim())
            .child(label)
            .child(description)
            .child(parts.body)
            .child(parts.errors)
            .child(parts.help)
            .into()
    }
}

/// Help text view. Absent or blank help renders nothing.
pub fn help_view(help: Option<&str>) -> Node {
    match help {
        Some(help) if !help.trim().is_empty() => Element::new("p")
            .class("help-block")
            .child(Node::text(help))
            .into(),
        _ => Node::Empty,
    }
}

/// Inline list of a field's own errors. No errors renders nothing.
pub fn errors_view(errors: &[String]) -> Node {
    if errors.is_empty() {
        return Node::Empty;
    }

    let items = errors
        .iter()
        .map(|error| Node::from(Element::new("li").child(Node::text(error.as_str()))));

    Element::new("div")
        .class("ui error message")
        .child(Element::new("ul").class("list").children(items))
        .into()
}

/// Form-level error panel listing every flattened error.
pub fn error_list(entries: &[ErrorEntry]) -> Node {
    let items = entries.iter().map(|entry| {
        Node::from(
            Element::new("li").child(
                Element::new("span")
                    .class("error")
                    .child(Node::text(entry.stack.as_str())),
            ),
        )
    });

    Element::new("div")
        .class("error-list")
        .child(
            Element::new("div")
                .class("ui error message")
                .child(
                    Element::new("div")
                        .class("panel-heading")
                        .child(Element::new("h3").class("panel-title").child(Node::text("Errors"))),
                )
                .child(Element::new("ul").class("list").children(items)),
        )
        .into()
}
