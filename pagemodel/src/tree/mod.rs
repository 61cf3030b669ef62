//! Arena-backed page tree.
//!
//! All nodes live in one [`Tree`]; parent and child links are [`NodeId`]
//! indices. Detached nodes stay in the arena but are unreachable from the
//! root.
//!
//! ## Submodules
//!
//! - [`path`] - Paths shared by schema and data space
//! - [`node`] - The generic node, actions and sortability
//! - [`property`] - Leaf properties, descriptive keywords and variants
//! - [`values`] - Value assignment and annotation linkage
//! - [`drop`] - Drag-and-drop legality

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::{ModelError, Result},
    i18n::I18nBundle,
    kinds::NodeKind,
    schema::SchemaFragment,
};

/// Drag-and-drop legality.
pub mod drop;

/// The generic node, actions and sortability.
pub mod node;

/// Paths shared by schema and data space.
pub mod path;

/// Leaf properties, descriptive keywords and variants.
pub mod property;

/// Value assignment and annotation linkage.
pub mod values;

pub use drop::{DropRange, DropTarget};
pub use node::{ActionKind, Node, SortMode, SupportedAction, Template, TemplateSource};
pub use path::{NodePath, PathSegment};
pub use property::{Descriptive, Property, ValidationState, Variant, VariantChild};

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owner of every node of one page.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding only a root node.
    pub fn new(kind: NodeKind, schema: SchemaFragment) -> Self {
        Self::with_root_path(kind, schema, NodePath::root())
    }

    /// Create a tree whose root sits at `path`, used for scratch parses of
    /// a subtree.
    pub fn with_root_path(kind: NodeKind, schema: SchemaFragment, path: NodePath) -> Self {
        let key = path.last().map(ToString::to_string).unwrap_or_default();
        let mut root = Node::new(NodeId(0), kind, key, schema);
        root.path = path;
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id, if it exists.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Mutable node by id, if it exists.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutable node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Allocate a detached node.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        key: impl Into<String>,
        schema: SchemaFragment,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, kind, key.into(), schema));
        id
    }

    /// Register `child` under `parent`.
    ///
    /// With an explicit `order`, every sibling at or above that position
    /// shifts up by one; otherwise the child is appended. The child's path
    /// and the paths of its descendants are rewritten.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, for children that already have a parent and
    /// when `parent` already has a child under `segment`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        segment: impl Into<PathSegment>,
        child: NodeId,
        order: Option<usize>,
    ) -> Result<()> {
        self.get(parent).ok_or(ModelError::UnknownNode(parent))?;
        let child_node = self.get(child).ok_or(ModelError::UnknownNode(child))?;
        if child_node.parent.is_some() || child == self.root {
            return Err(ModelError::AlreadyAttached {
                path: child_node.path.to_string(),
            });
        }

        let segment = segment.into();
        let name = segment.to_string();
        if self.node(parent).children.contains_key(&name) {
            return Err(ModelError::DuplicateChild {
                parent: self.node(parent).path.to_string(),
                key: name,
            });
        }

        let count = self.node(parent).children.len();
        let order = match order {
            Some(requested) => {
                let requested = requested.min(count);
                let siblings: Vec<NodeId> = self.node(parent).children.values().copied().collect();
                for sibling in siblings {
                    let s = self.node_mut(sibling);
                    if s.order >= requested {
                        s.order += 1;
                    }
                }
                requested
            }
            None => count,
        };

        let path = self.node(parent).path.child(segment);
        let node = self.node_mut(child);
        node.key = name.clone();
        node.parent = Some(parent);
        node.order = order;
        node.path = path;
        self.node_mut(parent).children.insert(name, child);
        self.rewrite_descendant_paths(child);
        Ok(())
    }

    /// Remove a node from its parent, closing the gap in sibling order.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(|n| n.parent) else {
            return;
        };
        let key = self.node(id).key.clone();
        let order = self.node(id).order;
        self.node_mut(parent).children.shift_remove(&key);
        let siblings: Vec<NodeId> = self.node(parent).children.values().copied().collect();
        for sibling in siblings {
            let s = self.node_mut(sibling);
            if s.order > order {
                s.order -= 1;
            }
        }
        self.node_mut(id).parent = None;
    }

    /// Move a node to `order` among its siblings.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids.
    pub fn move_child(&mut self, id: NodeId, order: usize) -> Result<()> {
        let node = self.get(id).ok_or(ModelError::UnknownNode(id))?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let current = node.order;
        let last = self.node(parent).children.len().saturating_sub(1);
        let target = order.min(last);
        if target == current {
            return Ok(());
        }
        let siblings: Vec<NodeId> = self.node(parent).children.values().copied().collect();
        for sibling in siblings {
            let s = self.node_mut(sibling);
            if sibling == id {
                s.order = target;
            } else if current < target && s.order > current && s.order <= target {
                s.order -= 1;
            } else if target < current && s.order >= target && s.order < current {
                s.order += 1;
            }
        }
        Ok(())
    }

    /// Point a node at a new path and rewrite its descendants.
    pub fn set_path(&mut self, id: NodeId, path: NodePath) {
        self.node_mut(id).path = path;
        self.rewrite_descendant_paths(id);
    }

    fn rewrite_descendant_paths(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let base = self.node(current).path.clone();
            let children: Vec<NodeId> = self.node(current).children.values().copied().collect();
            for child in children {
                let last = self
                    .node(child)
                    .path
                    .last()
                    .cloned()
                    .unwrap_or_else(|| PathSegment::Key(self.node(child).key.clone()));
                self.node_mut(child).path = base.child(last);
                stack.push(child);
            }
        }
    }

    /// Create or replace a leaf property.
    pub fn add_property(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        fragment: &SchemaFragment,
    ) -> &mut Property {
        let name = name.into();
        let node = self.node_mut(id);
        let property = Property::new(name.clone(), fragment);
        node.properties.insert(name.clone(), property);
        &mut node.properties[&name]
    }

    /// Child id by key.
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id).children.get(key).copied()
    }

    /// Parent id.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children sorted by their order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.node(id).children.values().copied().collect();
        children.sort_by_key(|c| self.node(*c).order);
        children
    }

    /// Siblings of `id` in order, `id` excluded.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self
                .children(parent)
                .into_iter()
                .filter(|c| *c != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Nearest ancestor of the given kind.
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.node(*a).kind == kind)
    }

    /// `id` and every attached descendant, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Find an attached node by path.
    pub fn find_by_path(&self, path: &NodePath) -> Option<NodeId> {
        path.segments().iter().try_fold(self.root, |current, seg| {
            self.node(current)
                .children
                .values()
                .copied()
                .find(|c| self.node(*c).path.last() == Some(seg))
        })
    }

    /// Outline label of a node.
    pub fn display_name(&self, id: NodeId, bundle: &I18nBundle) -> String {
        (self.node(id).kind.ops().display_name)(self, id, bundle)
    }

    /// Kind-specific technical name.
    pub fn technical_name(&self, id: NodeId) -> Option<String> {
        (self.node(id).kind.ops().technical_name)(self, id)
    }

    /// Rebuild the data value held by a subtree.
    ///
    /// Only schema-declared properties and children appear in the result.
    pub fn to_value(&self, id: NodeId) -> Value {
        let node = self.node(id);
        if node.kind == NodeKind::AtomicItem {
            return node.value.clone().unwrap_or(Value::Null);
        }
        if node.schema.is_array() || node.kind == NodeKind::Atomic {
            return Value::Array(
                self.children(id)
                    .into_iter()
                    .filter(|c| self.node(*c).has_value())
                    .map(|c| self.to_value(c))
                    .collect(),
            );
        }

        let mut out = Map::new();
        for (name, prop) in &node.properties {
            if let Some(value) = &prop.value {
                out.insert(name.clone(), value.clone());
            }
        }
        for child in self.children(id) {
            let child_node = self.node(child);
            if child_node.has_value() {
                let key = child_node
                    .path
                    .last()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| child_node.key.clone());
                out.insert(key, self.to_value(child));
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_children(n: usize) -> (Tree, Vec<NodeId>) {
        let mut tree = Tree::new(NodeKind::Sections, SchemaFragment::default());
        let root = tree.root();
        let ids = (0..n)
            .map(|i| {
                let id = tree.create_node(NodeKind::Section, "", SchemaFragment::default());
                tree.add_child(root, format!("S{i}"), id, None).unwrap();
                id
            })
            .collect();
        (tree, ids)
    }

    fn orders(tree: &Tree) -> Vec<usize> {
        let mut o: Vec<usize> = tree
            .node(tree.root())
            .children()
            .values()
            .map(|c| tree.node(*c).order)
            .collect();
        o.sort();
        o
    }

    #[test]
    fn test_insert_with_order_shifts_siblings() {
        let (mut tree, ids) = tree_with_children(3);
        let root = tree.root();
        let new = tree.create_node(NodeKind::Section, "", SchemaFragment::default());
        tree.add_child(root, "Custom", new, Some(1)).unwrap();

        assert_eq!(tree.node(new).order, 1);
        assert_eq!(tree.node(ids[0]).order, 0);
        assert_eq!(tree.node(ids[1]).order, 2);
        assert_eq!(tree.node(ids[2]).order, 3);
        assert_eq!(orders(&tree), vec![0, 1, 2, 3]);
        assert_eq!(tree.node(new).path.to_string(), "/Custom");
    }

    #[test]
    fn test_order_out_of_range_is_clamped() {
        let (mut tree, _) = tree_with_children(2);
        let root = tree.root();
        let new = tree.create_node(NodeKind::Section, "", SchemaFragment::default());
        tree.add_child(root, "Late", new, Some(40)).unwrap();
        assert_eq!(orders(&tree), vec![0, 1, 2]);
        assert_eq!(tree.node(new).order, 2);
    }

    #[test]
    fn test_attach_twice_fails() {
        let (mut tree, ids) = tree_with_children(1);
        let root = tree.root();
        let err = tree.add_child(root, "Again", ids[0], None).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyAttached { .. }));
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let (mut tree, ids) = tree_with_children(2);
        let root = tree.root();
        let other = tree.create_node(NodeKind::Section, "", SchemaFragment::default());
        let err = tree.add_child(root, "S1", other, None).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateChild { .. }));
        assert_eq!(tree.child(root, "S1"), Some(ids[1]));
        assert!(tree.parent(other).is_none());
        assert_eq!(orders(&tree), vec![0, 1]);
    }

    #[test]
    fn test_detach_and_move_keep_orders_contiguous() {
        let (mut tree, ids) = tree_with_children(4);
        tree.detach(ids[1]);
        assert_eq!(orders(&tree), vec![0, 1, 2]);
        assert!(tree.parent(ids[1]).is_none());

        tree.move_child(ids[3], 0).unwrap();
        assert_eq!(tree.children(tree.root()), vec![ids[3], ids[0], ids[2]]);
        assert_eq!(orders(&tree), vec![0, 1, 2]);
    }

    #[test]
    fn test_paths_rewritten_recursively() {
        let mut tree = Tree::new(NodeKind::Page, SchemaFragment::default());
        let root = tree.root();
        let table = tree.create_node(NodeKind::Table, "", SchemaFragment::default());
        let columns = tree.create_node(NodeKind::Columns, "", SchemaFragment::default());
        tree.add_child(table, "columns", columns, None).unwrap();
        tree.add_child(root, "table", table, None).unwrap();
        assert_eq!(tree.node(columns).path.to_string(), "/table/columns");
        assert_eq!(
            tree.find_by_path(&tree.node(columns).path.clone()),
            Some(columns)
        );

        tree.set_path(table, NodePath::root().child("gridTable"));
        assert_eq!(tree.node(columns).path.to_string(), "/gridTable/columns");
    }
}
