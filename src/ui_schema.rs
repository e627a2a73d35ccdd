//! UI-schema overlay - presentation directives layered over a data schema.
//!
//! Keys starting with `ui:` are directives for the node they sit on. Any other
//! object-valued key (except `classNames`) is the overlay of the child field
//! with that name; array items use the `items` key.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::registry::Field;
use crate::types::{
    CLASS_NAMES, HIDDEN_WIDGET, UI_AUTOFOCUS, UI_DESCRIPTION, UI_DISABLED, UI_FIELD, UI_HELP,
    UI_OPTIONS, UI_ORDER, UI_PREFIX, UI_READONLY, UI_TITLE, UI_WIDGET,
};

static EMPTY: UiSchema = UiSchema {
    field: None,
    widget: None,
    disabled: false,
    read_only: false,
    auto_focus: false,
    title: None,
    description: None,
    help: None,
    order: None,
    class_names: None,
    options: BTreeMap::new(),
    children: BTreeMap::new(),
};

/// An explicit `ui:field` override.
#[derive(Clone)]
pub enum FieldOverride {
    /// Renderer looked up in the registry by name.
    Named(String),
    /// Renderer supplied directly by the host.
    Custom(Arc<dyn Field>),
    /// A non-string `ui:field` value. It selects no renderer but still
    /// counts as an override for label display.
    Opaque(Value),
}

impl PartialEq for FieldOverride {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldOverride::Named(a), FieldOverride::Named(b)) => a == b,
            (FieldOverride::Custom(a), FieldOverride::Custom(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (FieldOverride::Opaque(a), FieldOverride::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for FieldOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOverride::Named(name) => f.debug_tuple("Named").field(name).finish(),
            FieldOverride::Custom(_) => f.write_str("Custom(..)"),
            FieldOverride::Opaque(value) => f.debug_tuple("Opaque").field(value).finish(),
        }
    }
}

/// Parsed overlay for one node and, recursively, its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSchema {
    pub field: Option<FieldOverride>,
    pub widget: Option<String>,
    pub disabled: bool,
    pub read_only: bool,
    pub auto_focus: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
    pub order: Option<Vec<String>>,
    pub class_names: Option<String>,
    /// `ui:options` merged with every other `ui:*` key, prefix stripped.
    pub options: BTreeMap<String, Value>,
    pub children: BTreeMap<String, UiSchema>,
}

impl UiSchema {
    /// The overlay with no directives.
    pub fn empty() -> &'static UiSchema {
        &EMPTY
    }

    /// Parse an overlay document. Malformed directives are ignored.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let mut ui = UiSchema::default();
        for (key, value) in map {
            if let Some(option) = key.strip_prefix(UI_PREFIX) {
                ui.apply_directive(key, option, value);
            } else if key == CLASS_NAMES {
                ui.class_names = value.as_str().map(String::from);
            } else if value.is_object() {
                ui.children.insert(key.clone(), UiSchema::from_value(value));
            }
        }
        ui
    }

    fn apply_directive(&mut self, key: &str, option: &str, value: &Value) {
        match key {
            UI_FIELD => {
                self.field = match value {
                    Value::String(name) if !name.is_empty() => {
                        Some(FieldOverride::Named(name.clone()))
                    }
                    Value::String(_) => None,
                    other if truthy(other) => Some(FieldOverride::Opaque(other.clone())),
                    _ => None,
                }
            }
            UI_WIDGET => {
                self.widget = value
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .map(String::from)
            }
            UI_DISABLED => self.disabled = truthy(value),
            UI_READONLY => self.read_only = truthy(value),
            UI_AUTOFOCUS => self.auto_focus = truthy(value),
            UI_TITLE => self.title = value.as_str().map(String::from),
            UI_DESCRIPTION => self.description = value.as_str().map(String::from),
            UI_HELP => self.help = value.as_str().map(String::from),
            UI_ORDER => {
                self.order = value.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
            }
            _ => {}
        }

        match (key, value) {
            (UI_OPTIONS, Value::Object(options)) => {
                for (name, option) in options {
                    self.options.insert(name.clone(), option.clone());
                }
            }
            (UI_OPTIONS, _) => {}
            // Object-valued widgets are legacy component declarations
            (UI_WIDGET, Value::Object(_)) => {}
            _ => {
                self.options.insert(option.to_string(), value.clone());
            }
        }
    }

    /// Set a host-supplied renderer as the field override.
    pub fn with_field(mut self, field: Arc<dyn Field>) -> Self {
        self.field = Some(FieldOverride::Custom(field));
        self
    }

    /// Set a named field override.
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field = Some(FieldOverride::Named(name.into()));
        self
    }

    /// Overlay of a child field, or the empty overlay.
    pub fn child(&self, name: &str) -> &UiSchema {
        self.children.get(name).unwrap_or(&EMPTY)
    }

    /// Whether the widget directive hides this field.
    pub fn is_hidden(&self) -> bool {
        self.widget.as_deref() == Some(HIDDEN_WIDGET)
    }

    /// The `label` option, if set to a boolean.
    pub fn label_option(&self) -> Option<bool> {
        self.options.get("label").and_then(Value::as_bool)
    }

    /// This overlay as handed to the field body, with consumed class names removed.
    pub fn without_class_names(&self) -> Cow<'_, UiSchema> {
        if self.class_names.is_none() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(UiSchema {
            class_names: None,
            ..self.clone()
        })
    }
}

impl From<&Value> for UiSchema {
    fn from(value: &Value) -> Self {
        UiSchema::from_value(value)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
