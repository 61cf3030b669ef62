//! Leaf properties, descriptive keywords and variants.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::{
    i18n::format_key,
    kinds::NodeKind,
    schema::{ArtifactType, Message, SchemaFragment},
};

use super::Tree;
use super::NodeId;

/// Whether a node or property is sanctioned by the matched variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationState {
    #[default]
    Valid,
    Invalid,
    Skipped,
}

/// Descriptive keywords copied from the governing schema fragments.
///
/// When the same keyword is declared at several `$ref` depths, the
/// shallowest declaration wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptive {
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub pattern: Option<String>,
    pub artifact_type: Option<ArtifactType>,
    pub minimum: Option<f64>,
    pub action_type: Option<String>,
    pub is_view_node: Option<bool>,
    pub messages: Vec<Message>,
    depth: Option<usize>,
}

impl Descriptive {
    /// Copy the descriptive keywords of `fragment`, declared at `depth`.
    pub fn absorb(&mut self, fragment: &SchemaFragment, depth: usize) {
        let wins = self.depth.is_none_or(|d| depth <= d);

        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>, wins: bool) {
            if value.is_some() && (wins || slot.is_none()) {
                *slot = value.clone();
            }
        }

        take(&mut self.title, &fragment.title, wins);
        take(&mut self.description, &fragment.description, wins);
        take(&mut self.display_name, &fragment.display_name, wins);
        take(&mut self.pattern, &fragment.pattern, wins);
        take(&mut self.artifact_type, &fragment.artifact_type, wins);
        take(&mut self.minimum, &fragment.minimum, wins);
        take(&mut self.action_type, &fragment.action_type, wins);
        take(&mut self.is_view_node, &fragment.is_view_node, wins);
        if !fragment.messages.is_empty() && (wins || self.messages.is_empty()) {
            self.messages = fragment.messages.clone();
        }
        if wins {
            self.depth = Some(depth);
        }
    }
}

/// A leaf value of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Key under the owning node.
    pub name: String,
    /// Copy of the governing fragment.
    pub schema: SchemaFragment,
    pub value: Option<Value>,
    pub state: ValidationState,
    pub required: bool,
    /// Free-form entry is allowed alongside enumerated choices.
    pub free_text: bool,
    /// Created from a dynamic template rather than declared by the schema.
    pub dynamic: bool,
    pub descriptive: Descriptive,
    pub messages: Vec<Message>,
}

impl Property {
    /// Create a property from its fragment.
    pub fn new(name: impl Into<String>, fragment: &SchemaFragment) -> Self {
        Self {
            name: name.into(),
            schema: fragment.clone(),
            value: None,
            state: ValidationState::Valid,
            required: false,
            free_text: fragment.free_text,
            dynamic: false,
            descriptive: Descriptive::default(),
            messages: Vec::new(),
        }
    }

    /// Declared display name, or the formatted key.
    pub fn display_name(&self) -> String {
        self.descriptive
            .display_name
            .clone()
            .or_else(|| self.schema.display_name.clone())
            .unwrap_or_else(|| format_key(&self.name))
    }

    /// Whether a non-null value is set.
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_null())
    }
}

/// A child declared by a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantChild {
    pub kind: NodeKind,
    /// Source key in data when the child is a union member.
    pub union_source: Option<String>,
    /// What the child itself declares in this alternative.
    pub shape: Variant,
}

/// One alternative property/child set of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variant {
    pub name: String,
    pub properties: IndexMap<String, SchemaFragment>,
    pub children: IndexMap<String, VariantChild>,
}

impl Variant {
    /// Whether the variant declares `key` as property or child.
    pub fn declares(&self, key: &str) -> bool {
        self.properties.contains_key(key) || self.children.contains_key(key)
    }

    /// Capture the shape parsed into `id` of a scratch tree.
    pub fn from_tree(tree: &Tree, id: NodeId, name: impl Into<String>) -> Self {
        let node = tree.node(id);
        let properties = node
            .properties
            .iter()
            .map(|(k, p)| (k.clone(), p.schema.clone()))
            .collect();
        let children = node
            .children
            .iter()
            .map(|(key, &child)| {
                let union_source = node
                    .unions
                    .get(key)
                    .and_then(|sources| sources.first().cloned());
                let shape = Variant::from_tree(tree, child, key.clone());
                (
                    key.clone(),
                    VariantChild {
                        kind: tree.node(child).kind,
                        union_source,
                        shape,
                    },
                )
            })
            .collect();
        Self {
            name: name.into(),
            properties,
            children,
        }
    }
}
