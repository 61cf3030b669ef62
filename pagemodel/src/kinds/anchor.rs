//! User-authored actions and filter fields placed next to an anchor.

use crate::tree::{NodeId, Tree};

use super::{HookContext, KindData};

/// Anchor of a custom action or filter field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorData {
    pub anchor: String,
    /// A sibling or annotation node answers to the anchor.
    pub resolved: bool,
}

/// The anchor named by `anchor` or `position.anchor`.
fn declared_anchor(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    node.property_str("anchor")
        .map(str::to_string)
        .or_else(|| {
            let position = node
                .properties
                .get("position")
                .and_then(|p| p.value.as_ref())
                .or_else(|| node.value.as_ref()?.get("position"))?;
            position.get("anchor")?.as_str().map(str::to_string)
        })
        .or_else(|| {
            let position = tree.child(id, "position")?;
            tree.node(position).property_str("anchor").map(str::to_string)
        })
}

pub(super) fn on_values_updated(tree: &mut Tree, id: NodeId, ctx: &HookContext<'_>) {
    if !tree.node(id).custom {
        return;
    }
    let Some(anchor) = declared_anchor(tree, id) else {
        return;
    };
    let resolved = tree.siblings(id).into_iter().any(|s| {
        let sibling = tree.node(s);
        sibling.key == anchor
            || sibling.annotation_link.as_deref() == Some(anchor.as_str())
            || tree.technical_name(s).as_deref() == Some(anchor.as_str())
    }) || ctx.annotations.get(&anchor).is_some();

    let node = tree.node_mut(id);
    if !resolved {
        node.reject(format!("Anchor `{anchor}` no longer exists"));
    }
    node.data = KindData::Anchor(AnchorData { anchor, resolved });
}
