//! Sections.
//!
//! A section id comes from the facet id in the schema metadata, or else from
//! the title (V4 pages) or description (V2 pages). User-authored sections
//! name an anchor through `relatedFacet` and a `relativePosition`.

use serde::Serialize;

use crate::{
    config::PageGeneration,
    i18n::I18nBundle,
    tree::{ActionKind, Node, NodeId, Tree},
};

use super::{HookContext, KindData, NodeKind};

/// Placement of a custom section relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RelativePosition {
    Before,
    #[default]
    After,
    /// Shown in place of the anchor, which is hidden.
    Replace,
}

impl RelativePosition {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "Before" | "before" => Self::Before,
            "After" | "after" => Self::After,
            "Replace" | "replace" => Self::Replace,
            _ => return None,
        })
    }
}

/// Derived data of a section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionData {
    pub id: String,
    pub related_facet: Option<String>,
    pub position: RelativePosition,
    /// Sibling the section was positioned against.
    pub anchor: Option<NodeId>,
}

/// Section id of a node.
pub fn section_id(node: &Node, generation: PageGeneration) -> String {
    let from_schema = match generation {
        PageGeneration::V4 => node.descriptive.title.as_deref(),
        PageGeneration::V2 => node.descriptive.description.as_deref(),
    };
    node.schema
        .metadata
        .as_ref()
        .and_then(|m| m.facet_id.as_deref())
        .or(from_schema)
        .unwrap_or(&node.key)
        .to_string()
}

pub(super) fn display_name(tree: &Tree, id: NodeId, bundle: &I18nBundle) -> String {
    let d = &tree.node(id).descriptive;
    [d.description.as_deref(), d.title.as_deref()]
        .into_iter()
        .flatten()
        .map(|text| bundle.resolve_text(text))
        .find(|text| !text.trim().is_empty())
        .or_else(|| technical_name(tree, id))
        .unwrap_or_else(|| tree.node(id).key.clone())
}

pub(super) fn technical_name(tree: &Tree, id: NodeId) -> Option<String> {
    match &tree.node(id).data {
        KindData::Section(data) => Some(data.id.clone()),
        _ => None,
    }
}

pub(super) fn on_values_updated(tree: &mut Tree, id: NodeId, ctx: &HookContext<'_>) {
    let generation = ctx.options.generation;
    let node = tree.node(id);
    let mut data = SectionData {
        id: section_id(node, generation),
        ..Default::default()
    };

    if node.custom {
        data.related_facet = node.property_str("relatedFacet").map(str::to_string);
        data.position = node
            .property_str("relativePosition")
            .and_then(RelativePosition::parse)
            .unwrap_or_default();
    }

    if let Some(facet) = data.related_facet.clone() {
        let anchor = tree.siblings(id).into_iter().find(|s| {
            let sibling = tree.node(*s);
            !sibling.custom
                && (section_id(sibling, generation) == facet
                    || sibling.annotation_link.as_deref() == Some(facet.as_str())
                    || sibling.key == facet)
        });
        match anchor {
            Some(anchor) => {
                place_relative(tree, id, anchor, data.position);
                data.anchor = Some(anchor);
            }
            None if ctx.annotations.get(&facet).is_some() => {}
            None => {
                debug!("custom section {} lost its anchor `{facet}`", tree.node(id).path);
                tree.node_mut(id)
                    .reject(format!("Related facet `{facet}` no longer exists"));
            }
        }
    }

    tree.node_mut(id).data = KindData::Section(data);
}

fn place_relative(tree: &mut Tree, id: NodeId, anchor: NodeId, position: RelativePosition) {
    let own = tree.node(id).order;
    let at = tree.node(anchor).order;
    let target = match position {
        RelativePosition::Before if own < at => at - 1,
        RelativePosition::Before => at,
        RelativePosition::After | RelativePosition::Replace if own < at => at,
        RelativePosition::After | RelativePosition::Replace => at + 1,
    };
    if let Err(err) = tree.move_child(id, target) {
        warn!("cannot position custom section: {err}");
    }
    if position == RelativePosition::Replace {
        tree.node_mut(anchor).visible = false;
    }
}

/// Keep the last schema-derived section when custom sections point at it.
pub(super) fn protect_referenced_section(tree: &mut Tree, id: NodeId, _: &HookContext<'_>) {
    let members = tree.children(id);
    let schema_sections: Vec<NodeId> = members
        .iter()
        .copied()
        .filter(|m| {
            let node = tree.node(*m);
            node.kind == NodeKind::Section && !node.custom
        })
        .collect();
    let &[last] = schema_sections.as_slice() else {
        return;
    };
    let referenced = members.iter().any(|m| {
        let node = tree.node(*m);
        node.custom && matches!(&node.data, KindData::Section(d) if d.anchor == Some(last))
    });
    if referenced {
        tree.node_mut(last)
            .disable_action(ActionKind::Delete, "Section is referenced by custom sections");
    }
}
