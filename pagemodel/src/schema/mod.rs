//! Schema document access: definitions, `$ref` resolution and merging.
//!
//! ## Submodules
//!
//! - [`fragment`] - Closed keyword representation of one schema fragment

/// Closed keyword representation of one schema fragment.
pub mod fragment;

pub use fragment::{
    ArtifactType, Items, KeyEntry, Message, SchemaFragment, SchemaMetadata, SchemaType, Severity,
};

use indexmap::IndexMap;
use serde_json::{Map, Value};

const DEFINITION_PREFIXES: [&str; 2] = ["#/definitions/", "#/$defs/"];

/// Keys where the referenced definition wins over local overrides.
pub const DEEP_KEYS: [&str; 6] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "items",
    "anyOf",
    "required",
];

/// A page schema with its addressable definitions.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    root: Value,
    definitions: IndexMap<String, Value>,
}

impl SchemaDocument {
    /// Wrap a schema value, collecting `definitions` and `$defs`.
    pub fn new(root: Value) -> Self {
        let mut definitions = IndexMap::new();
        for key in ["definitions", "$defs"] {
            match root.get(key) {
                Some(Value::Object(defs)) => {
                    for (name, def) in defs {
                        definitions.insert(name.clone(), def.clone());
                    }
                }
                Some(other) => warn!("schema `{key}` should be an object, got {other}"),
                None => {}
            }
        }
        Self { root, definitions }
    }

    /// The root schema.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look a definition up by bare name.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    /// Definition name addressed by a `$ref`.
    pub fn reference_name(reference: &str) -> Option<&str> {
        DEFINITION_PREFIXES
            .iter()
            .find_map(|prefix| reference.strip_prefix(prefix))
    }

    /// Resolve a `$ref` to its definition name and schema.
    pub fn resolve(&self, reference: &str) -> Option<(&str, &Value)> {
        let name = Self::reference_name(reference)?;
        self.definitions
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Merge a referencing fragment with the definition it points to.
    ///
    /// Local keywords override the definition except for [`DEEP_KEYS`]; the
    /// local `$ref` itself is dropped.
    pub fn merge_ref(local: &Value, referenced: &Value) -> Value {
        let mut merged: Map<String, Value> = referenced.as_object().cloned().unwrap_or_default();
        if let Some(local) = local.as_object() {
            for (key, value) in local {
                if key == "$ref" {
                    continue;
                }
                if DEEP_KEYS.contains(&key.as_str()) && merged.contains_key(key) {
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
        }
        Value::Object(merged)
    }

    /// Resolve `$ref` chains of a fragment without descending into it.
    ///
    /// Used where only the shape of an alternative matters. Gives up after
    /// `limit` hops.
    pub fn shallow_resolve(&self, fragment: &Value, limit: usize) -> Value {
        let mut current = fragment.clone();
        for _ in 0..limit {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                break;
            };
            let Some((_, def)) = self.resolve(reference) else {
                break;
            };
            current = Self::merge_ref(&current, def);
        }
        current
    }
}
