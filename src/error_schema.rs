//! Validation error trees and their one-level projection.
//!
//! An error tree mirrors the shape of the schema. Each node holds the
//! messages that belong to it and a map of child trees keyed by property
//! name or item index. The orchestrator consumes exactly one level per
//! recursion step: it keeps the own messages and hands the child map down.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ResolveError;
use crate::types::{json_type_name, ERRORS_KEY};

static EMPTY: ErrorSchema = ErrorSchema {
    errors: Vec::new(),
    children: BTreeMap::new(),
};

/// A node of the validation error tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSchema {
    /// Messages belonging to this node.
    pub errors: Vec<String>,
    /// Error trees of child properties or items.
    pub children: BTreeMap<String, ErrorSchema>,
}

/// The split of an error tree node into own messages and descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection<'a> {
    pub own_errors: &'a [String],
    pub children: &'a BTreeMap<String, ErrorSchema>,
}

impl Projection<'_> {
    /// Whether this node carries messages of its own.
    pub fn contains_errors(&self) -> bool {
        !self.own_errors.is_empty()
    }
}

/// One flattened error, as shown in a form-level error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    /// Dotted path of the field, empty for the root.
    pub property: String,
    pub message: String,
    /// `"<field>: <message>"`, with `root` for the top node.
    pub stack: String,
}

impl ErrorSchema {
    /// An error tree without any messages.
    pub fn empty() -> &'static ErrorSchema {
        &EMPTY
    }

    /// Build a node holding only its own messages.
    pub fn with_errors<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
            children: BTreeMap::new(),
        }
    }

    /// Attach a child tree.
    pub fn child(mut self, name: impl Into<String>, child: ErrorSchema) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    /// Split this node one level deep.
    pub fn project(&self) -> Projection<'_> {
        Projection {
            own_errors: &self.errors,
            children: &self.children,
        }
    }

    /// Error tree of a named child, or the empty tree.
    pub fn child_of<'a>(children: &'a BTreeMap<String, ErrorSchema>, name: &str) -> &'a Self {
        children.get(name).unwrap_or(&EMPTY)
    }

    /// True if neither this node nor any descendant carries a message.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.children.values().all(ErrorSchema::is_empty)
    }

    /// Total number of messages in the tree.
    pub fn len(&self) -> usize {
        self.errors.len() + self.children.values().map(ErrorSchema::len).sum::<usize>()
    }

    /// Flatten the tree into a list, parents before children.
    pub fn to_error_list(&self) -> Vec<ErrorEntry> {
        let mut entries = Vec::new();
        self.collect_entries("", "root", &mut entries);
        entries
    }

    fn collect_entries(&self, property: &str, field: &str, entries: &mut Vec<ErrorEntry>) {
        for message in &self.errors {
            entries.push(ErrorEntry {
                property: property.to_string(),
                message: message.clone(),
                stack: format!("{}: {}", field, message),
            });
        }
        for (name, child) in &self.children {
            let path = if property.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", property, name)
            };
            child.collect_entries(&path, name, entries);
        }
    }

    /// Parse the wire shape `{"__errors": [..], "<child>": {..}}`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidErrorSchema` if a node is not an object,
    /// `__errors` is not a list of strings, or a child is not an object.
    pub fn from_value(value: &Value) -> Result<Self, ResolveError> {
        Self::parse(value, "")
    }

    fn parse(value: &Value, path: &str) -> Result<Self, ResolveError> {
        let Value::Object(map) = value else {
            return Err(invalid(path, "object", value));
        };

        let mut node = ErrorSchema::default();
        for (key, child) in map {
            let child_path = format!("{}/{}", path, key);
            if key == ERRORS_KEY {
                let Value::Array(messages) = child else {
                    return Err(invalid(&child_path, "array", child));
                };
                for (i, message) in messages.iter().enumerate() {
                    let Value::String(message) = message else {
                        return Err(invalid(&format!("{}/{}", child_path, i), "string", message));
                    };
                    node.errors.push(message.clone());
                }
            } else {
                node.children
                    .insert(key.clone(), Self::parse(child, &child_path)?);
            }
        }
        Ok(node)
    }
}

fn invalid(path: &str, expected: &'static str, actual: &Value) -> ResolveError {
    ResolveError::InvalidErrorSchema {
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        expected,
        actual: json_type_name(actual).to_string(),
    }
}

impl Serialize for ErrorSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_errors = !self.errors.is_empty();
        let mut map = serializer.serialize_map(Some(self.children.len() + has_errors as usize))?;
        if has_errors {
            map.serialize_entry(ERRORS_KEY, &self.errors)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ErrorSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ErrorSchema::from_value(&value).map_err(serde::de::Error::custom)
    }
}
