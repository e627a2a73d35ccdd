//! Renderable output tree.
//!
//! The engine produces a small element tree instead of driving a widget
//! toolkit. Hosts map elements onto their own widgets.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A renderable node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// Renders nothing. Keeps layout stable where optional chrome is absent.
    Empty,
    Text { text: String },
    Element(Element),
}

/// An element with attributes and children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "className", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            class_name: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set a boolean attribute only when it is true.
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on {
            self.attr(name, true)
        } else {
            self
        }
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I: IntoIterator<Item = Node>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether the space separated class list contains `class_name`.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.class_name
            .as_deref()
            .map(|c| c.split_whitespace().any(|part| part == class_name))
            .unwrap_or(false)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text { text } => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Depth-first search for the first element matching `predicate`.
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        let element = self.as_element()?;
        if predicate(element) {
            return Some(element);
        }
        element.children.iter().find_map(|child| child.find(predicate))
    }

    /// First element with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.find(&|e| e.id.as_deref() == Some(id))
    }

    /// All elements carrying `class_name`, in document order.
    pub fn find_all_by_class(&self, class_name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_by_class(class_name, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class_name: &str, found: &mut Vec<&'a Element>) {
        if let Node::Element(element) = self {
            if element.has_class(class_name) {
                found.push(element);
            }
            for child in &element.children {
                child.collect_by_class(class_name, found);
            }
        }
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Node::Empty => Ok(()),
            Node::Text { text } => writeln!(f, "{}\"{}\"", indent, text),
            Node::Element(element) => {
                write!(f, "{}<{}", indent, element.tag)?;
                if let Some(id) = &element.id {
                    write!(f, " #{}", id)?;
                }
                if let Some(class_name) = &element.class_name {
                    write!(f, " .{}", class_name.split_whitespace().collect::<Vec<_>>().join("."))?;
                }
                for (name, value) in &element.attrs {
                    write!(f, " {}={}", name, value)?;
                }
                writeln!(f, ">")?;
                for child in &element.children {
                    child.write_outline(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Indented outline, one element or text per line. Empty nodes are omitted.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}
