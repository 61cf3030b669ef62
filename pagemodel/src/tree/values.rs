//! Value assignment and annotation linkage.
//!
//! A values pass resets everything derived from data, walks the tree with
//! the matching data slice, links nodes to annotation descriptors, computes
//! the default action set and finally runs the per-kind hooks.

use serde_json::Value;

use crate::{
    annotation::AnnotationIndex,
    kinds::{HookContext, NodeKind},
    schema::{ArtifactType, Items, SchemaFragment},
};

use super::{ActionKind, NodeId, PathSegment, SortMode, Tree};

const READ_ONLY_REASON: &str = "Source annotation is read-only";
const UNLINKED_REASON: &str = "Source annotation is not available";

/// Member of an object, or item of an array addressed by its index name.
fn member<'v>(data: &'v Value, name: &str) -> Option<&'v Value> {
    match data {
        Value::Object(map) => map.get(name),
        Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Data slice for a child of `id`.
fn child_data<'v>(
    tree: &Tree,
    id: NodeId,
    child: NodeId,
    data: Option<&'v Value>,
) -> Option<&'v Value> {
    let data = data?;
    let node = tree.node(id);
    let child_node = tree.node(child);
    if let Some(sources) = node.unions.get(&child_node.key) {
        return sources
            .iter()
            .find_map(|s| member(data, s).filter(|v| !v.is_null()));
    }
    match child_node.path.last()? {
        PathSegment::Key(k) => member(data, k),
        PathSegment::Index(i) => data.get(*i),
    }
}

/// Assign `data` to the subtree at `id`, then run the kind hooks.
pub fn update_values(tree: &mut Tree, id: NodeId, data: Option<&Value>, ctx: &HookContext<'_>) {
    assign(tree, id, data, ctx.annotations);
    for node in tree.descendants(id) {
        let hook = tree.node(node).kind.ops().on_values_updated;
        hook(tree, node, ctx);
    }
}

fn assign(tree: &mut Tree, id: NodeId, data: Option<&Value>, annotations: &AnnotationIndex<'_>) {
    let parent = tree.parent(id);
    let parent_context = parent.and_then(|p| tree.node(p).annotation_context.clone());
    let in_collection = parent.is_some_and(|p| tree.node(p).kind.is_collection());
    let inherited_lock = parent.is_some_and(|p| tree.node(p).locked);

    let node = tree.node_mut(id);
    node.actions.clear();
    node.messages.clear();
    node.inactive = false;
    node.visible = true;
    node.sortable = SortMode::None;
    node.value = data.filter(|v| !v.is_null()).cloned();

    if node.dynamic && node.annotation_link.is_none() && annotations.get(&node.key).is_some() {
        node.annotation_link = Some(node.key.clone());
    }
    // Values stored in the annotation artifact are generated, whatever
    // their key.
    node.custom = node.dynamic
        && node.annotation_link.is_none()
        && node.descriptive.artifact_type != Some(ArtifactType::Annotation)
        && matches!(node.path.last(), Some(PathSegment::Key(_)));
    node.annotation_context = node.annotation_link.clone().or(parent_context);
    node.locked = !node.custom
        && (inherited_lock
            || node
                .annotation_context
                .as_deref()
                .is_some_and(|ctx| annotations.is_read_only(ctx)));

    for (name, property) in node.properties.iter_mut() {
        property.value = data
            .and_then(|d| member(d, name))
            .filter(|v| !v.is_null())
            .cloned();
    }

    if let Some(descriptor) = node.annotation_link.as_deref().and_then(|l| annotations.get(l)) {
        node.allowed_drop_parents = descriptor.allowed_parent_ids.clone();
        if descriptor.location.is_some() {
            node.location = descriptor.location.clone();
        }
    }

    default_actions(tree, id, in_collection, annotations);

    if tree.node(id).kind == NodeKind::Atomic {
        sync_atomic_items(tree, id, data);
    }

    for child in tree.children(id) {
        let slice = child_data(tree, id, child, data);
        assign(tree, child, slice, annotations);
    }
}

fn default_actions(
    tree: &mut Tree,
    id: NodeId,
    in_collection: bool,
    annotations: &AnnotationIndex<'_>,
) {
    let node = tree.node_mut(id);
    if in_collection {
        node.sortable = SortMode::Movable;
        node.add_action(ActionKind::Move);
        node.add_action(ActionKind::Delete);
    }
    if node.kind.is_collection() && (node.addable || !node.templates.is_empty()) {
        node.add_action(ActionKind::Add);
    }
    if node.custom || node.location.is_some() {
        node.add_action(ActionKind::OpenSource);
    }

    if node.custom {
        return;
    }
    if node.locked {
        node.disable_action(ActionKind::Delete, READ_ONLY_REASON);
        node.disable_action(ActionKind::Move, READ_ONLY_REASON);
    }
    if node.sortable == SortMode::Movable
        && node
            .annotation_link
            .as_deref()
            .is_none_or(|l| annotations.get(l).is_none())
    {
        node.sortable = SortMode::ReadOnly;
        node.remove_action(ActionKind::Delete);
        node.disable_action(ActionKind::Move, UNLINKED_REASON);
    }
}

/// Keep one [`NodeKind::AtomicItem`] child per scalar in the data array.
fn sync_atomic_items(tree: &mut Tree, id: NodeId, data: Option<&Value>) {
    let items = data.and_then(Value::as_array).map_or(0, Vec::len);
    let item_schema = match &tree.node(id).schema.items {
        Some(Items::Shared(schema)) => SchemaFragment::parse(schema, "items"),
        _ => SchemaFragment::default(),
    };

    for child in tree.children(id) {
        let stale = match tree.node(child).path.last() {
            Some(PathSegment::Index(i)) => *i >= items,
            _ => true,
        };
        if stale {
            tree.detach(child);
        }
    }
    for i in 0..items {
        if tree.child(id, &i.to_string()).is_some() {
            continue;
        }
        let item = tree.create_node(NodeKind::AtomicItem, i.to_string(), item_schema.clone());
        if let Err(err) = tree.add_child(id, i, item, None) {
            warn!("cannot add item {i} to {}: {err}", tree.node(id).path);
        }
    }
}
