//! Multi-view collections.

use crate::tree::{ActionKind, NodeId, Tree};

use super::HookContext;

/// Reason the delete action of a view is disabled, if it is.
///
/// The suppressed view can never be deleted. A schema-derived view can only
/// be deleted while another schema-derived view remains.
pub fn view_delete_blocker(
    view_key: &str,
    custom: bool,
    suppressed_view_id: Option<&str>,
    schema_views: usize,
) -> Option<&'static str> {
    if suppressed_view_id == Some(view_key) {
        Some("View is suppressed")
    } else if !custom && schema_views <= 1 {
        Some("At least one view is required")
    } else {
        None
    }
}

pub(super) fn restrict_view_deletion(tree: &mut Tree, id: NodeId, ctx: &HookContext<'_>) {
    let members = tree.children(id);
    let schema_views = members.iter().filter(|m| !tree.node(**m).custom).count();
    let suppressed = ctx.options.suppressed_view_id.as_deref();
    for member in members {
        let node = tree.node_mut(member);
        if let Some(reason) = view_delete_blocker(&node.key, node.custom, suppressed, schema_views)
        {
            node.disable_action(ActionKind::Delete, reason);
        }
    }
}

pub(super) fn technical_name(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    node.property_str("key")
        .or_else(|| node.property_str("annotationPath"))
        .map(str::to_string)
}
