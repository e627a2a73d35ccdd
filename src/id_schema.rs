//! Identity schema - stable per-node identifiers derived from schema paths.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ResolveError;
use crate::resolver::SchemaResolver;
use crate::types::{SchemaType, ID_KEY, REF_KEY};

/// Identifier of a node plus the identifiers of its object properties.
///
/// Identifiers depend only on the path and the schema, so they stay stable
/// across re-renders of an unchanged subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSchema {
    pub id: String,
    pub children: BTreeMap<String, IdSchema>,
}

impl IdSchema {
    /// A leaf identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: BTreeMap::new(),
        }
    }

    /// Identity of a named child, derived from this one when not precomputed.
    pub fn child(&self, name: &str) -> IdSchema {
        self.children
            .get(name)
            .cloned()
            .unwrap_or_else(|| IdSchema::new(child_id(&self.id, name)))
    }
}

/// Identifier of a child node: `<parent>_<name>`.
pub fn child_id(parent: &str, name: &str) -> String {
    format!("{}_{}", parent, name)
}

/// Build the identity schema of `schema` rooted at `id`.
///
/// Object properties get `<parent>_<name>`. Array items are numbered by the
/// array renderer as it walks the data, so arrays stay leaves here. A
/// reference already being expanded further up is not expanded again; the
/// ids below it are derived on demand by [`IdSchema::child`].
///
/// # Errors
///
/// Returns `ResolveError` if a reference on the way cannot be resolved.
pub fn to_id_schema(
    schema: &Value,
    id: &str,
    resolver: &SchemaResolver<'_>,
    form_data: &Value,
) -> Result<IdSchema, ResolveError> {
    build(schema, id, resolver, form_data, &mut Vec::new())
}

fn build(
    schema: &Value,
    id: &str,
    resolver: &SchemaResolver<'_>,
    form_data: &Value,
    expanding: &mut Vec<String>,
) -> Result<IdSchema, ResolveError> {
    let reference = schema.get(REF_KEY).and_then(Value::as_str);
    if reference.map_or(false, |r| expanding.iter().any(|e| e == r)) {
        return Ok(IdSchema::new(id));
    }

    let resolved = resolver.resolve(schema, form_data)?;
    let mut id_schema = IdSchema::new(id);

    if SchemaType::of(&resolved) != Some(SchemaType::Object) {
        return Ok(id_schema);
    }

    if let Some(Value::Object(properties)) = resolved.get("properties") {
        if let Some(reference) = reference {
            expanding.push(reference.to_string());
        }
        for (name, property) in properties {
            let child_data = form_data.get(name).unwrap_or(&Value::Null);
            let child = build(property, &child_id(id, name), resolver, child_data, expanding)?;
            id_schema.children.insert(name.clone(), child);
        }
        if reference.is_some() {
            expanding.pop();
        }
    }

    Ok(id_schema)
}

impl Serialize for IdSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len() + 1))?;
        map.serialize_entry(ID_KEY, &self.id)?;
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}
