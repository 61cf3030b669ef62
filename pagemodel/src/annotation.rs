//! Annotation bundle: descriptors tying model nodes to their declarative
//! source.
//!
//! Nodes reference annotation entries by id only; the bundle is owned by the
//! model and consulted through an [`AnnotationIndex`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Position of a definition inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// File URI or path.
    pub uri: String,
    /// Zero-based start line.
    #[serde(default)]
    pub line: u32,
    /// Zero-based start column.
    #[serde(default)]
    pub character: u32,
}

/// One annotation descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationNode {
    /// Unique id (for facets, the facet id).
    pub id: String,
    /// Annotation type tag, e.g. `ReferenceFacet` or `DataField`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Source annotation path, e.g. `@UI.Facets/0`.
    pub annotation_path: Option<String>,
    /// Nested descriptors.
    pub children: Vec<AnnotationNode>,
    /// Ids of annotation nodes this node may be dropped into.
    pub allowed_parent_ids: Vec<String>,
    /// Whether the source cannot be edited.
    pub read_only: bool,
    /// Where the annotation is defined.
    pub location: Option<SourceLocation>,
}

/// The annotation bundle handed to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationBundle {
    /// Annotation descriptors of the page.
    pub nodes: Vec<AnnotationNode>,
    /// Descriptors for nodes that only exist in data.
    pub dynamic_nodes: Vec<AnnotationNode>,
    /// Opaque context for dialogs, passed through untouched.
    pub dialogs_context: Option<Value>,
    /// Error reported by the producer of the bundle.
    pub error_message: Option<String>,
}

/// Id and path lookups over an [`AnnotationBundle`].
#[derive(Debug, Default)]
pub struct AnnotationIndex<'a> {
    by_id: HashMap<&'a str, &'a AnnotationNode>,
    by_path: HashMap<&'a str, &'a AnnotationNode>,
    parents: HashMap<&'a str, &'a str>,
}

impl<'a> AnnotationIndex<'a> {
    /// Index every descriptor of the bundle, nested ones included.
    pub fn new(bundle: &'a AnnotationBundle) -> Self {
        let mut index = Self::default();
        for node in bundle.nodes.iter().chain(&bundle.dynamic_nodes) {
            index.insert(node, None);
        }
        if let Some(msg) = &bundle.error_message {
            warn!("annotation bundle reports an error: {msg}");
        }
        index
    }

    fn insert(&mut self, node: &'a AnnotationNode, parent: Option<&'a str>) {
        if !node.id.is_empty() {
            if self.by_id.insert(node.id.as_str(), node).is_some() {
                debug!("duplicate annotation id `{}`, last one wins", node.id);
            }
            if let Some(parent) = parent {
                self.parents.insert(node.id.as_str(), parent);
            }
        }
        if let Some(path) = &node.annotation_path {
            self.by_path.insert(path.as_str(), node);
        }
        let own = (!node.id.is_empty()).then_some(node.id.as_str());
        for child in &node.children {
            self.insert(child, own.or(parent));
        }
    }

    /// Find a descriptor by id.
    pub fn get(&self, id: &str) -> Option<&'a AnnotationNode> {
        self.by_id.get(id).copied()
    }

    /// Find a descriptor by its source annotation path.
    pub fn by_annotation_path(&self, path: &str) -> Option<&'a AnnotationNode> {
        self.by_path.get(path).copied()
    }

    /// Id of the descriptor enclosing `id`.
    pub fn parent_id(&self, id: &str) -> Option<&'a str> {
        self.parents.get(id).copied()
    }

    /// Whether `id` or any enclosing descriptor is read-only.
    pub fn is_read_only(&self, id: &str) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            if self.get(id).is_some_and(|n| n.read_only) {
                return true;
            }
            current = self.parent_id(id);
        }
        false
    }

    /// Scan for a descriptor whose id matches an internal building-block id.
    ///
    /// Building-block ids are matched exactly or as the last `::` segment of
    /// the descriptor id.
    pub fn find_building_block(&self, internal_id: &str) -> Option<&'a AnnotationNode> {
        self.get(internal_id).or_else(|| {
            let mut found: Vec<&'a AnnotationNode> = self
                .by_id
                .values()
                .copied()
                .filter(|n| n.id.rsplit("::").next() == Some(internal_id))
                .collect();
            found.sort_by(|a, b| a.id.cmp(&b.id));
            found.into_iter().next()
        })
    }
}
