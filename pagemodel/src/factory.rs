//! Node kind selection.
//!
//! [`NodeFactory`] decides which [`NodeKind`] a new aggregation gets from
//! its path, its parent and its schema fragment. The decision is an ordered
//! predicate table; the first predicate that matches wins.

use crate::{
    kinds::NodeKind,
    schema::SchemaFragment,
    tree::{Node, NodePath, NodeId, Tree},
};

/// What the factory looks at.
pub struct FactoryInput<'a> {
    pub path: &'a NodePath,
    pub parent: Option<&'a Node>,
    pub fragment: &'a SchemaFragment,
    /// The node stands for a data-only key.
    pub dynamic: bool,
}

impl FactoryInput<'_> {
    fn key(&self) -> Option<&str> {
        self.path.last().and_then(|s| s.as_key())
    }

    fn parent_key(&self) -> Option<&str> {
        self.parent.map(|p| p.key.as_str())
    }

    fn parent_kind(&self) -> Option<NodeKind> {
        self.parent.map(|p| p.kind)
    }

    fn element_type(&self) -> Option<&str> {
        self.fragment.element_type()
    }

    fn control_ends_with(&self, suffix: &str) -> bool {
        self.fragment
            .control_name()
            .is_some_and(|c| c.ends_with(suffix))
    }
}

struct Predicate {
    name: &'static str,
    kind: NodeKind,
    test: fn(&FactoryInput<'_>) -> bool,
}

const PREDICATES: &[Predicate] = &[
    Predicate {
        name: "atomic array",
        kind: NodeKind::Atomic,
        test: |i| i.fragment.is_array() && i.fragment.has_atomic_items(),
    },
    Predicate {
        name: "building block",
        kind: NodeKind::BuildingBlockRoot,
        test: |i| i.parent_key() == Some("macros") || i.element_type() == Some("BuildingBlock"),
    },
    Predicate {
        name: "table columns",
        kind: NodeKind::Columns,
        test: |i| i.path.ends_with(&["table", "columns"]),
    },
    Predicate {
        name: "sections",
        kind: NodeKind::Sections,
        test: |i| matches!(i.key(), Some("sections" | "subsections")),
    },
    Predicate {
        name: "views",
        kind: NodeKind::Views,
        test: |i| i.key() == Some("views"),
    },
    Predicate {
        name: "filter fields",
        kind: NodeKind::FilterFields,
        test: |i| {
            i.path.ends_with(&["filterBar", "selectionFields"])
                || i.key() == Some("filterFields")
        },
    },
    Predicate {
        name: "visual filters",
        kind: NodeKind::VisualFilters,
        test: |i| i.key() == Some("visualFilters"),
    },
    Predicate {
        name: "actions",
        kind: NodeKind::Actions,
        test: |i| i.key() == Some("actions"),
    },
    Predicate {
        name: "fields",
        kind: NodeKind::Fields,
        test: |i| i.key() == Some("fields"),
    },
    Predicate {
        name: "view chart",
        kind: NodeKind::Chart,
        test: |i| i.parent_kind() == Some(NodeKind::View) && i.key() == Some("chart"),
    },
    Predicate {
        name: "chart control",
        kind: NodeKind::Chart,
        test: |i| i.control_ends_with(".Chart") || i.element_type() == Some("Chart"),
    },
    Predicate {
        name: "table",
        kind: NodeKind::Table,
        test: |i| {
            i.key() == Some("table")
                || i.control_ends_with("Table")
                || i.element_type() == Some("Table")
        },
    },
    Predicate {
        name: "section",
        kind: NodeKind::Section,
        test: |i| i.element_type() == Some("Section"),
    },
    Predicate {
        name: "additional object",
        kind: NodeKind::AdditionalObject,
        test: |i| i.dynamic && !i.parent_kind().is_some_and(NodeKind::is_collection),
    },
];

/// Chooses node kinds and allocates nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeFactory;

impl NodeFactory {
    /// Pick the kind for `input`.
    pub fn kind_for(&self, input: &FactoryInput<'_>) -> NodeKind {
        if let Some(p) = PREDICATES.iter().find(|p| (p.test)(input)) {
            trace!("{}: {} -> {:?}", input.path, p.name, p.kind);
            return p.kind;
        }
        if let Some(kind) = input.parent_kind().and_then(|k| k.ops().child_kind) {
            return kind;
        }
        if input.fragment.is_array() {
            NodeKind::Array
        } else {
            NodeKind::Object
        }
    }

    /// Allocate a detached node for the aggregation at `path` below
    /// `parent`.
    pub fn create(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        path: &NodePath,
        fragment: SchemaFragment,
        dynamic: bool,
    ) -> NodeId {
        let kind = self.kind_for(&FactoryInput {
            path,
            parent: Some(tree.node(parent)),
            fragment: &fragment,
            dynamic,
        });
        let key = path.last().map(ToString::to_string).unwrap_or_default();
        let id = tree.create_node(kind, key, fragment);
        let node = tree.node_mut(id);
        node.dynamic = dynamic;
        node.view_node = kind.ops().view_node;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind_at(path: &[&str], parent: Option<&Node>, schema: serde_json::Value) -> NodeKind {
        let path: NodePath = path.iter().copied().collect();
        let fragment = SchemaFragment::parse(&schema, "t");
        NodeFactory.kind_for(&FactoryInput {
            path: &path,
            parent,
            fragment: &fragment,
            dynamic: false,
        })
    }

    #[test]
    fn test_structural_paths() {
        let obj = json!({ "type": "object" });
        assert_eq!(kind_at(&["sections"], None, obj.clone()), NodeKind::Sections);
        assert_eq!(
            kind_at(&["sections", "S1", "table", "columns"], None, obj.clone()),
            NodeKind::Columns
        );
        assert_eq!(
            kind_at(&["filterBar", "selectionFields"], None, obj.clone()),
            NodeKind::FilterFields
        );
        assert_eq!(kind_at(&["header", "actions"], None, obj.clone()), NodeKind::Actions);
        assert_eq!(kind_at(&["generalInfo"], None, obj), NodeKind::Object);
    }

    #[test]
    fn test_metadata_and_parent_decide() {
        assert_eq!(
            kind_at(
                &["myChart"],
                None,
                json!({ "type": "object", "metadata": { "controlName": "sap.suite.ui.Chart" } })
            ),
            NodeKind::Chart
        );
        assert_eq!(
            kind_at(&["tags"], None, json!({ "type": "array", "items": { "type": "string" } })),
            NodeKind::Atomic
        );

        let mut tree = Tree::new(NodeKind::Page, SchemaFragment::default());
        let columns = tree.create_node(NodeKind::Columns, "columns", SchemaFragment::default());
        assert_eq!(
            kind_at(&["table", "columns", "DataField::Price"], Some(tree.node(columns)), json!({})),
            NodeKind::Column
        );
        let macros = tree.create_node(NodeKind::Object, "macros", SchemaFragment::default());
        assert_eq!(
            kind_at(&["macros", "FilterBar1"], Some(tree.node(macros)), json!({ "type": "object" })),
            NodeKind::BuildingBlockRoot
        );
    }
}
