//! Schema resolution - turns abstract schema fragments into concrete ones.
//!
//! A fragment is abstract when it carries a `$ref` into the definitions table
//! or `dependencies` whose effect depends on the current form data. Resolution
//! substitutes references and applies the dependencies that the data triggers.
//! A fragment that is already concrete comes back borrowed, so callers can
//! compare by identity.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::types::REF_KEY;

/// Reference prefixes that point into the definitions table.
const DEFINITION_PREFIXES: &[&str] = &["#/definitions/", "#/$defs/"];

/// Decides whether form data satisfies a branch condition.
///
/// Branch selection belongs to whatever validates the form; the resolver
/// only asks the question.
pub trait BranchMatcher: Send + Sync {
    /// Returns true if `form_data` satisfies `condition`.
    ///
    /// `definitions` is the table references inside `condition` point into.
    fn matches(&self, condition: &Value, form_data: &Value, definitions: &Map<String, Value>)
        -> bool;
}

/// Branch matcher backed by a JSON Schema validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaMatcher;

impl BranchMatcher for JsonSchemaMatcher {
    fn matches(
        &self,
        condition: &Value,
        form_data: &Value,
        definitions: &Map<String, Value>,
    ) -> bool {
        let mut schema = condition.clone();
        if let Value::Object(map) = &mut schema {
            if !definitions.is_empty() {
                for key in ["definitions", "$defs"] {
                    map.entry(key)
                        .or_insert_with(|| Value::Object(definitions.clone()));
                }
            }
        }

        match jsonschema::validator_for(&schema) {
            Ok(validator) => validator.is_valid(form_data),
            Err(e) => {
                log::warn!("ignoring invalid branch condition: {}", e);
                false
            }
        }
    }
}

static DEFAULT_MATCHER: JsonSchemaMatcher = JsonSchemaMatcher;

/// Resolves schema fragments against a read-only definitions table.
#[derive(Clone, Copy)]
pub struct SchemaResolver<'d> {
    definitions: &'d Map<String, Value>,
    matcher: &'d dyn BranchMatcher,
}

impl fmt::Debug for SchemaResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaResolver")
            .field("definitions", &self.definitions.len())
            .finish_non_exhaustive()
    }
}

impl<'d> SchemaResolver<'d> {
    /// Create a resolver using the JSON Schema branch matcher.
    pub fn new(definitions: &'d Map<String, Value>) -> Self {
        Self {
            definitions,
            matcher: &DEFAULT_MATCHER,
        }
    }

    /// Replace the branch matcher.
    pub fn with_matcher(mut self, matcher: &'d dyn BranchMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// The definitions table references resolve against.
    pub fn definitions(&self) -> &'d Map<String, Value> {
        self.definitions
    }

    /// Resolve a fragment into a concrete schema for the given form data.
    ///
    /// Returns the input borrowed when it has no reference and no
    /// dependencies. Resolving a resolved schema yields it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnresolvedReference` if a `$ref` is not in the
    /// definitions table, `ResolveError::CircularReference` if references loop.
    pub fn resolve<'a>(
        &self,
        schema: &'a Value,
        form_data: &Value,
    ) -> Result<Cow<'a, Value>, ResolveError> {
        let schema = self.resolve_reference(Cow::Borrowed(schema), &mut Vec::new())?;
        self.resolve_dependencies(schema, form_data)
    }

    /// Look up a `#/definitions/...` or `#/$defs/...` pointer.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnresolvedReference` for foreign pointers and
    /// for pointers that lead nowhere.
    pub fn find_definition(&self, reference: &str) -> Result<&'d Value, ResolveError> {
        let unresolved = || ResolveError::UnresolvedReference {
            reference: reference.to_string(),
        };

        let pointer = DEFINITION_PREFIXES
            .iter()
            .find_map(|prefix| reference.strip_prefix(prefix))
            .ok_or_else(unresolved)?;

        let mut parts = pointer.split('/').map(unescape_pointer);
        let name = parts.next().ok_or_else(unresolved)?;
        let mut current = self.definitions.get(&name).ok_or_else(unresolved)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(&part),
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(unresolved)?;
        }
        Ok(current)
    }

    fn resolve_reference<'a>(
        &self,
        schema: Cow<'a, Value>,
        seen: &mut Vec<String>,
    ) -> Result<Cow<'a, Value>, ResolveError> {
        let Some(reference) = schema.get(REF_KEY).and_then(Value::as_str) else {
            return Ok(schema);
        };

        if seen.iter().any(|r| r == reference) {
            return Err(ResolveError::CircularReference {
                reference: reference.to_string(),
            });
        }

        let target = self.find_definition(reference)?;
        seen.push(reference.to_string());

        // Sibling keys of the reference win over the referenced fragment
        let mut merged = match target {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Value::Object(local) = schema.as_ref() {
            for (key, value) in local {
                if key != REF_KEY {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }

        self.resolve_reference(Cow::Owned(Value::Object(merged)), seen)
    }

    fn resolve_dependencies<'a>(
        &self,
        schema: Cow<'a, Value>,
        form_data: &Value,
    ) -> Result<Cow<'a, Value>, ResolveError> {
        self.apply_dependencies(schema, form_data, &mut Vec::new())
    }

    /// `active` holds the references of the dependent schemas being applied,
    /// so a dependency that leads back to itself is reported instead of looping.
    fn apply_dependencies<'a>(
        &self,
        schema: Cow<'a, Value>,
        form_data: &Value,
        active: &mut Vec<String>,
    ) -> Result<Cow<'a, Value>, ResolveError> {
        let Some(Value::Object(dependencies)) = schema.get("dependencies") else {
            return Ok(schema);
        };

        let mut resolved = without_keys(schema.as_object(), &["dependencies"]);

        for (key, dependency) in dependencies {
            // Only dependencies on keys present in the data apply
            if form_data.get(key).is_none() {
                continue;
            }
            match dependency {
                Value::Array(names) => merge_required(&mut resolved, names),
                Value::Object(_) => {
                    let entered = enter(dependency, active)?;
                    let applied =
                        self.apply_schema_dependency(&mut resolved, key, dependency, form_data, active);
                    if entered {
                        active.pop();
                    }
                    applied?
                }
                _ => {}
            }
        }

        Ok(Cow::Owned(Value::Object(resolved)))
    }

    fn apply_schema_dependency(
        &self,
        target: &mut Map<String, Value>,
        key: &str,
        dependency: &Value,
        form_data: &Value,
        active: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        let dependency = self.resolve_reference(Cow::Borrowed(dependency), &mut Vec::new())?;

        // Dependencies nested in the dependent schema see the same form data
        let dependent = Value::Object(without_keys(dependency.as_object(), &["oneOf"]));
        let dependent = self.apply_dependencies(Cow::Owned(dependent), form_data, active)?;
        if let Value::Object(dependent) = dependent.as_ref() {
            merge_schemas(target, dependent);
        }

        let Some(Value::Array(branches)) = dependency.get("oneOf") else {
            return Ok(());
        };

        let mut matching = Vec::new();
        for branch in branches {
            let resolved = self.resolve_reference(Cow::Borrowed(branch), &mut Vec::new())?;
            let Some(condition) = resolved.get("properties").and_then(|p| p.get(key)) else {
                continue;
            };

            let mut properties = Map::new();
            properties.insert(key.to_string(), condition.clone());
            let mut condition_schema = Map::new();
            condition_schema.insert("type".to_string(), Value::String("object".to_string()));
            condition_schema.insert("properties".to_string(), Value::Object(properties));

            if self
                .matcher
                .matches(&Value::Object(condition_schema), form_data, self.definitions)
            {
                matching.push((branch, resolved));
            }
        }

        match matching.as_slice() {
            [(raw, branch)] => {
                let mut selected = without_keys(branch.as_object(), &["oneOf"]);
                if let Some(Value::Object(properties)) = selected.get_mut("properties") {
                    *properties = without_keys(Some(&*properties), &[key]);
                }

                let entered = enter(raw, active)?;
                let selected = self.apply_dependencies(
                    Cow::Owned(Value::Object(selected)),
                    form_data,
                    active,
                );
                if entered {
                    active.pop();
                }
                if let Value::Object(selected) = selected?.as_ref() {
                    merge_schemas(target, selected);
                }
            }
            [] => log::warn!("no dependency branch for '{}' matches the form data", key),
            many => log::warn!(
                "{} dependency branches for '{}' match the form data, expected exactly one",
                many.len(),
                key
            ),
        }

        Ok(())
    }
}

/// Push the reference of a dependent schema onto the active stack.
/// Returns whether anything was pushed.
fn enter(schema: &Value, active: &mut Vec<String>) -> Result<bool, ResolveError> {
    let Some(reference) = schema.get(REF_KEY).and_then(Value::as_str) else {
        return Ok(false);
    };
    if active.iter().any(|r| r == reference) {
        return Err(ResolveError::CircularReference {
            reference: reference.to_string(),
        });
    }
    active.push(reference.to_string());
    Ok(true)
}

/// Collect the definitions table of a root schema.
///
/// Entries under `definitions` win over same-named entries under `$defs`.
pub fn definitions_of(schema: &Value) -> Map<String, Value> {
    let mut definitions = Map::new();
    for key in ["definitions", "$defs"] {
        if let Some(Value::Object(defs)) = schema.get(key) {
            for (name, definition) in defs {
                definitions
                    .entry(name.clone())
                    .or_insert_with(|| definition.clone());
            }
        }
    }
    definitions
}

/// Deep-merge `source` into `target`. `required` lists are unioned.
fn merge_schemas(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(left)), Value::Object(right)) => merge_schemas(left, right),
            (Some(Value::Array(left)), Value::Array(right)) if key == "required" => {
                for item in right {
                    if !left.contains(item) {
                        left.push(item.clone());
                    }
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_required(target: &mut Map<String, Value>, names: &[Value]) {
    let required = target
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(existing) = required {
        for name in names {
            if !existing.contains(name) {
                existing.push(name.clone());
            }
        }
    }
}

fn without_keys(map: Option<&Map<String, Value>>, keys: &[&str]) -> Map<String, Value> {
    map.map(|m| {
        m.iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
    .unwrap_or_default()
}

fn unescape_pointer(part: &str) -> String {
    // JSON Pointer encoding (~1 = /, ~0 = ~)
    part.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("definitions must be an object"),
        }
    }

    // === Reference Tests ===

    #[test]
    fn resolve_substitutes_reference() {
        let definitions = defs(json!({
            "address": { "type": "object", "title": "Address" }
        }));
        let schema = json!({ "$ref": "#/definitions/address" });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &Value::Null).unwrap();
        assert_eq!(*resolved, json!({ "type": "object", "title": "Address" }));
    }

    #[test]
    fn resolve_sibling_keys_override_reference() {
        let definitions = defs(json!({
            "name": { "type": "string", "title": "Name" }
        }));
        let schema = json!({ "$ref": "#/definitions/name", "title": "Full name" });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &Value::Null).unwrap();
        assert_eq!(resolved["title"], "Full name");
        assert_eq!(resolved["type"], "string");
        assert!(resolved.get("$ref").is_none());
    }

    #[test]
    fn resolve_follows_reference_chains() {
        let definitions = defs(json!({
            "a": { "$ref": "#/definitions/b" },
            "b": { "type": "integer" }
        }));
        let schema = json!({ "$ref": "#/definitions/a" });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &Value::Null).unwrap();
        assert_eq!(*resolved, json!({ "type": "integer" }));
    }

    #[test]
    fn resolve_defs_prefix_and_escaped_pointer() {
        let definitions = defs(json!({
            "a/b": { "nested": { "type": "boolean" } }
        }));
        let resolver = SchemaResolver::new(&definitions);

        let found = resolver.find_definition("#/$defs/a~1b/nested").unwrap();
        assert_eq!(*found, json!({ "type": "boolean" }));
    }

    #[test]
    fn resolve_missing_reference_errors() {
        let definitions = Map::new();
        let schema = json!({ "$ref": "#/definitions/missing" });
        let resolver = SchemaResolver::new(&definitions);

        let result = resolver.resolve(&schema, &Value::Null);
        assert!(matches!(
            result,
            Err(ResolveError::UnresolvedReference { reference }) if reference == "#/definitions/missing"
        ));
    }

    #[test]
    fn resolve_foreign_reference_errors() {
        let definitions = defs(json!({ "a": { "type": "string" } }));
        let schema = json!({ "$ref": "other.json#/a" });
        let resolver = SchemaResolver::new(&definitions);

        let result = resolver.resolve(&schema, &Value::Null);
        assert!(matches!(
            result,
            Err(ResolveError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn resolve_circular_reference_errors() {
        let definitions = defs(json!({
            "a": { "$ref": "#/definitions/b" },
            "b": { "$ref": "#/definitions/a" }
        }));
        let schema = json!({ "$ref": "#/definitions/a" });
        let resolver = SchemaResolver::new(&definitions);

        let result = resolver.resolve(&schema, &Value::Null);
        assert!(matches!(
            result,
            Err(ResolveError::CircularReference { .. })
        ));
    }

    #[test]
    fn resolve_concrete_schema_is_borrowed() {
        let definitions = Map::new();
        let schema = json!({ "type": "string", "title": "Name" });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &json!("x")).unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert!(std::ptr::eq(resolved.as_ref(), &schema));
    }

    // === Dependency Tests ===

    #[test]
    fn array_dependency_extends_required() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "card": { "type": "string" },
                "billing": { "type": "string" }
            },
            "dependencies": { "card": ["billing"] }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &json!({ "card": "4111" })).unwrap();
        assert_eq!(resolved["required"], json!(["name", "billing"]));
        assert!(resolved.get("dependencies").is_none());

        let untouched = resolver.resolve(&schema, &json!({ "name": "x" })).unwrap();
        assert_eq!(untouched["required"], json!(["name"]));
        assert!(untouched.get("dependencies").is_none());
    }

    #[test]
    fn schema_dependency_merges_properties() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "properties": { "card": { "type": "string" } },
            "dependencies": {
                "card": {
                    "properties": { "billing": { "type": "string" } },
                    "required": ["billing"]
                }
            }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &json!({ "card": "4111" })).unwrap();
        assert!(resolved["properties"].get("card").is_some());
        assert!(resolved["properties"].get("billing").is_some());
        assert_eq!(resolved["required"], json!(["billing"]));
    }

    #[test]
    fn nested_dependency_applies_against_form_data() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "dependencies": {
                "a": {
                    "properties": { "b": { "type": "string" } },
                    "dependencies": {
                        "b": { "properties": { "c": { "type": "string" } } }
                    }
                }
            }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver
            .resolve(&schema, &json!({ "a": "x", "b": "y" }))
            .unwrap();
        let properties = resolved["properties"].as_object().unwrap();
        assert!(properties.contains_key("b"));
        assert!(properties.contains_key("c"));
        assert!(resolved.get("dependencies").is_none());

        // Without the nested key the nested dependency stays dormant
        let resolved = resolver.resolve(&schema, &json!({ "a": "x" })).unwrap();
        let properties = resolved["properties"].as_object().unwrap();
        assert!(properties.contains_key("b"));
        assert!(!properties.contains_key("c"));
        assert!(resolved.get("dependencies").is_none());
    }

    #[test]
    fn nested_dependency_in_selected_branch_applies() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "properties": { "kind": { "enum": ["dog", "cat"] } },
            "dependencies": {
                "kind": {
                    "oneOf": [
                        {
                            "properties": {
                                "kind": { "enum": ["dog"] },
                                "breed": { "type": "string" }
                            },
                            "dependencies": { "breed": ["pedigree"] }
                        },
                        { "properties": { "kind": { "enum": ["cat"] } } }
                    ]
                }
            }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver
            .resolve(&schema, &json!({ "kind": "dog", "breed": "collie" }))
            .unwrap();
        assert!(resolved["properties"].get("breed").is_some());
        assert_eq!(resolved["required"], json!(["pedigree"]));
        assert!(resolved.get("dependencies").is_none());
    }

    #[test]
    fn self_referencing_dependency_errors() {
        let definitions = defs(json!({
            "loop": {
                "properties": { "a": { "type": "string" } },
                "dependencies": { "a": { "$ref": "#/definitions/loop" } }
            }
        }));
        let schema = json!({ "dependencies": { "a": { "$ref": "#/definitions/loop" } } });
        let resolver = SchemaResolver::new(&definitions);

        let err = resolver.resolve(&schema, &json!({ "a": "x" })).unwrap_err();
        assert!(matches!(err, ResolveError::CircularReference { .. }));
    }

    #[test]
    fn one_of_dependency_selects_matching_branch() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "properties": { "kind": { "enum": ["dog", "cat"] } },
            "dependencies": {
                "kind": {
                    "oneOf": [
                        {
                            "properties": {
                                "kind": { "enum": ["dog"] },
                                "barks": { "type": "boolean" }
                            }
                        },
                        {
                            "properties": {
                                "kind": { "enum": ["cat"] },
                                "lives": { "type": "integer" }
                            }
                        }
                    ]
                }
            }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &json!({ "kind": "cat" })).unwrap();
        let properties = resolved["properties"].as_object().unwrap();
        assert!(properties.contains_key("lives"));
        assert!(!properties.contains_key("barks"));
        // The condition property keeps its base definition
        assert_eq!(properties["kind"], json!({ "enum": ["dog", "cat"] }));
    }

    #[test]
    fn unmatched_branch_degrades_to_base() {
        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "properties": { "kind": { "type": "string" } },
            "dependencies": {
                "kind": {
                    "oneOf": [
                        { "properties": { "kind": { "enum": ["dog"] }, "barks": { "type": "boolean" } } }
                    ]
                }
            }
        });
        let resolver = SchemaResolver::new(&definitions);

        let resolved = resolver.resolve(&schema, &json!({ "kind": "fish" })).unwrap();
        assert_eq!(
            *resolved,
            json!({ "type": "object", "properties": { "kind": { "type": "string" } } })
        );
    }

    #[test]
    fn custom_matcher_decides_branch() {
        struct AlwaysSecond;
        impl BranchMatcher for AlwaysSecond {
            fn matches(&self, condition: &Value, _: &Value, _: &Map<String, Value>) -> bool {
                condition["properties"]["mode"]["const"] == "b"
            }
        }

        let definitions = Map::new();
        let schema = json!({
            "type": "object",
            "dependencies": {
                "mode": {
                    "oneOf": [
                        { "properties": { "mode": { "const": "a" }, "x": { "type": "string" } } },
                        { "properties": { "mode": { "const": "b" }, "y": { "type": "string" } } }
                    ]
                }
            }
        });
        let matcher = AlwaysSecond;
        let resolver = SchemaResolver::new(&definitions).with_matcher(&matcher);

        let resolved = resolver.resolve(&schema, &json!({ "mode": "a" })).unwrap();
        assert!(resolved["properties"].get("y").is_some());
        assert!(resolved["properties"].get("x").is_none());
    }

    #[test]
    fn resolve_is_idempotent() {
        let definitions = defs(json!({
            "pet": {
                "type": "object",
                "properties": { "kind": { "type": "string" } },
                "dependencies": { "kind": ["name"] }
            }
        }));
        let schema = json!({ "$ref": "#/definitions/pet" });
        let data = json!({ "kind": "dog" });
        let resolver = SchemaResolver::new(&definitions);

        let once = resolver.resolve(&schema, &data).unwrap().into_owned();
        let twice = resolver.resolve(&once, &data).unwrap();
        assert_eq!(*twice, once);
        assert!(matches!(twice, Cow::Borrowed(_)));
    }

    #[test]
    fn definitions_of_collects_both_keys() {
        let schema = json!({
            "definitions": { "a": { "type": "string" } },
            "$defs": { "a": { "type": "integer" }, "b": { "type": "boolean" } }
        });
        let definitions = definitions_of(&schema);
        assert_eq!(definitions["a"], json!({ "type": "string" }));
        assert_eq!(definitions["b"], json!({ "type": "boolean" }));
    }
}
