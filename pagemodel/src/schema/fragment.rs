//! Closed representation of the schema keywords the model consumes.
//!
//! A fragment is read tolerantly: a keyword with the wrong JSON type is
//! logged and ignored, unknown keywords are ignored silently.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON Schema `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl SchemaType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "object" => Self::Object,
            "array" => Self::Array,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            _ => return None,
        })
    }
}

/// Where a configured value ends up being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactType {
    Manifest,
    FlexChange,
    #[serde(rename = "XMLView")]
    XmlView,
    Annotation,
}

impl ArtifactType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "Manifest" => Self::Manifest,
            "FlexChange" => Self::FlexChange,
            "XMLView" => Self::XmlView,
            "Annotation" => Self::Annotation,
            _ => return None,
        })
    }
}

/// Message severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

/// A message attached to a node or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default)]
    pub severity: Severity,
    /// The user may remove the offending node to clear the message.
    #[serde(default)]
    pub deletable: bool,
}

impl Message {
    /// A deletable warning, as produced by extension validation.
    pub fn deletable_warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Warning,
            deletable: true,
        }
    }
}

/// The control-name metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// Explicit annotation node id.
    pub id: Option<String>,
    /// UI control name, e.g. `sap.m.Table`.
    pub control_name: Option<String>,
    /// Logical element type, e.g. `Section` or `Chart`.
    pub element_type: Option<String>,
    /// Facet id of a section.
    pub facet_id: Option<String>,
}

/// One entry of a declared key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub name: String,
    pub value: String,
}

/// `items` keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// One schema per array position.
    Tuple(Vec<Value>),
    /// One schema shared by every item.
    Shared(Value),
}

/// The consumed keyword subset of a schema fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaFragment {
    pub schema_type: Option<SchemaType>,
    pub reference: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub annotation_path: Option<String>,
    pub action_type: Option<String>,
    pub artifact_type: Option<ArtifactType>,
    pub metadata: Option<SchemaMetadata>,
    pub keys: Vec<KeyEntry>,
    pub property_index: Option<i64>,
    pub hidden: bool,
    pub is_view_node: Option<bool>,
    pub free_text: bool,
    pub union: Option<String>,
    pub messages: Vec<Message>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,
    pub default: Option<Value>,
    pub required: Vec<String>,
    pub any_of: Vec<Value>,
    pub properties: IndexMap<String, Value>,
    pub additional_properties: Option<Value>,
    pub pattern_properties: IndexMap<String, Value>,
    pub items: Option<Items>,
}

impl SchemaFragment {
    /// Read a raw schema value. `location` is only used in log output.
    pub fn parse(value: &Value, location: &str) -> Self {
        let Some(obj) = value.as_object() else {
            if !value.is_boolean() {
                warn!("schema at `{location}` is not an object, ignoring it");
            }
            return Self::default();
        };
        let r = Reader { obj, location };

        Self {
            schema_type: r.schema_type(),
            reference: r.string("$ref"),
            title: r.string("title"),
            description: r.string("description"),
            display_name: r.string("displayName"),
            annotation_path: r.string("annotationPath"),
            action_type: r.string("actionType"),
            artifact_type: r.string("artifactType").and_then(|s| {
                let parsed = ArtifactType::parse(&s);
                if parsed.is_none() {
                    warn!("unknown artifactType `{s}` at `{location}`");
                }
                parsed
            }),
            metadata: r.metadata(),
            keys: r.keys(),
            property_index: r.integer("propertyIndex"),
            hidden: r.boolean("hidden").unwrap_or(false),
            is_view_node: r.boolean("isViewNode"),
            free_text: r.boolean("freeText").unwrap_or(false),
            union: r.string("union"),
            messages: r.messages(),
            pattern: r.string("pattern"),
            minimum: r.number("minimum"),
            enum_values: r.array("enum").cloned(),
            const_value: obj.get("const").cloned(),
            default: obj.get("default").cloned(),
            required: r
                .array("required")
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            any_of: r.array("anyOf").cloned().unwrap_or_default(),
            properties: r.map("properties"),
            additional_properties: match obj.get("additionalProperties") {
                Some(v @ Value::Object(_)) => Some(v.clone()),
                Some(Value::Bool(true)) => Some(Value::Object(Map::new())),
                Some(Value::Bool(false)) | None => None,
                Some(other) => {
                    r.mismatch("additionalProperties", "object or boolean", other);
                    None
                }
            },
            pattern_properties: r.map("patternProperties"),
            items: match obj.get("items") {
                Some(Value::Array(a)) => Some(Items::Tuple(a.clone())),
                Some(v @ Value::Object(_)) => Some(Items::Shared(v.clone())),
                Some(Value::Bool(_)) | None => None,
                Some(other) => {
                    r.mismatch("items", "object or array", other);
                    None
                }
            },
        }
    }

    /// Object or array shaped, and not a reference.
    pub fn is_aggregation(&self) -> bool {
        if self.reference.is_some() {
            return false;
        }
        match self.schema_type {
            Some(SchemaType::Object | SchemaType::Array) => true,
            Some(_) => false,
            None => !self.properties.is_empty() || self.additional_properties.is_some(),
        }
    }

    /// Array shaped.
    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array)
    }

    /// Items are scalars, so data items become synthetic children.
    pub fn has_atomic_items(&self) -> bool {
        match &self.items {
            Some(Items::Shared(item)) => {
                let item = SchemaFragment::parse(item, "items");
                item.reference.is_none() && !item.is_aggregation() && item.any_of.is_empty()
            }
            _ => false,
        }
    }

    /// The explicit annotation id of the metadata block.
    pub fn metadata_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.id.as_deref())
    }

    /// The control name of the metadata block.
    pub fn control_name(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.control_name.as_deref())
    }

    /// The element type of the metadata block.
    pub fn element_type(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.element_type.as_deref())
    }
}

struct Reader<'a> {
    obj: &'a Map<String, Value>,
    location: &'a str,
}

impl<'a> Reader<'a> {
    fn mismatch(&self, key: &str, expected: &str, actual: &Value) {
        warn!(
            "schema keyword `{key}` at `{}` should be {expected}, got {actual}; skipped",
            self.location
        );
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.obj.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => {
                self.mismatch(key, "a string", other);
                None
            }
        }
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        match self.obj.get(key)? {
            Value::Bool(b) => Some(*b),
            other => {
                self.mismatch(key, "a boolean", other);
                None
            }
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        match self.obj.get(key)? {
            Value::Number(n) => n.as_f64(),
            other => {
                self.mismatch(key, "a number", other);
                None
            }
        }
    }

    fn integer(&self, key: &str) -> Option<i64> {
        match self.obj.get(key)? {
            Value::Number(n) if n.as_i64().is_some() => n.as_i64(),
            other => {
                self.mismatch(key, "an integer", other);
                None
            }
        }
    }

    fn array(&self, key: &str) -> Option<&'a Vec<Value>> {
        match self.obj.get(key)? {
            Value::Array(a) => Some(a),
            other => {
                self.mismatch(key, "an array", other);
                None
            }
        }
    }

    fn map(&self, key: &str) -> IndexMap<String, Value> {
        match self.obj.get(key) {
            Some(Value::Object(m)) => m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Some(other) => {
                self.mismatch(key, "an object", other);
                IndexMap::new()
            }
            None => IndexMap::new(),
        }
    }

    fn schema_type(&self) -> Option<SchemaType> {
        match self.obj.get("type")? {
            Value::String(s) => SchemaType::parse(s),
            // `["string", "null"]` style unions: the first non-null type wins
            Value::Array(types) => types
                .iter()
                .filter_map(|t| t.as_str().and_then(SchemaType::parse))
                .find(|t| *t != SchemaType::Null)
                .or(Some(SchemaType::Null)),
            other => {
                self.mismatch("type", "a string or array", other);
                None
            }
        }
    }

    fn metadata(&self) -> Option<SchemaMetadata> {
        let meta = match self.obj.get("metadata")? {
            Value::Object(m) => m,
            other => {
                self.mismatch("metadata", "an object", other);
                return None;
            }
        };
        let nested = Reader {
            obj: meta,
            location: self.location,
        };
        Some(SchemaMetadata {
            id: nested.string("id"),
            control_name: nested.string("controlName"),
            element_type: nested.string("type"),
            facet_id: nested.string("facetId"),
        })
    }

    fn keys(&self) -> Vec<KeyEntry> {
        let Some(entries) = self.array("keys") else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|e| {
                let name = e.get("name")?.as_str()?;
                let value = e.get("value")?.as_str()?;
                Some(KeyEntry {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            })
            .collect()
    }

    fn messages(&self) -> Vec<Message> {
        let Some(entries) = self.array("messages") else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|e| match e {
                Value::String(text) => Some(Message {
                    text: text.clone(),
                    severity: Severity::Info,
                    deletable: false,
                }),
                Value::Object(_) => match serde_json::from_value::<Message>(e.clone()) {
                    Ok(m) => Some(m),
                    Err(err) => {
                        warn!("malformed message at `{}`: {err}", self.location);
                        None
                    }
                },
                other => {
                    self.mismatch("messages[]", "a string or object", other);
                    None
                }
            })
            .collect()
    }
}
