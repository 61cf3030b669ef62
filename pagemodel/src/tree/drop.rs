//! Drag-and-drop legality.
//!
//! Positions are insertion indices into the target collection with the
//! dragged node removed.

use serde::Serialize;

use crate::kinds;

use super::{ActionKind, NodeId, SortMode, Tree};

/// Inclusive range of insertion positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropRange {
    pub start: usize,
    pub end: usize,
}

impl DropRange {
    /// Whether `position` lies inside the range.
    pub fn contains(&self, position: usize) -> bool {
        (self.start..=self.end).contains(&position)
    }
}

/// A collection the dragged node may be dropped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropTarget {
    pub collection: NodeId,
    pub ranges: Vec<DropRange>,
}

impl Tree {
    /// Move group of a node.
    pub fn move_group(&self, id: NodeId) -> Option<String> {
        (self.node(id).kind.ops().move_group)(self, id)
    }

    fn can_drag(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.sortable == SortMode::Movable && node.can(ActionKind::Move)
    }

    /// Positions of `target` where `source` may be inserted.
    ///
    /// Each contiguous run of members sharing the source's move group
    /// admits positions from its first member up to just past its last.
    /// A collection without such members admits every position. A foreign
    /// collection that already holds a member under the source's key admits
    /// none.
    pub fn allowed_drop_range(&self, source: NodeId, target: NodeId) -> Vec<DropRange> {
        if !self.can_drag(source) || !self.node(target).kind.is_collection() {
            return Vec::new();
        }
        if self.parent(source) != Some(target)
            && self.node(target).children.contains_key(&self.node(source).key)
        {
            return Vec::new();
        }
        let group = self.move_group(source);
        let members: Vec<NodeId> = self
            .children(target)
            .into_iter()
            .filter(|m| *m != source)
            .collect();

        let mut ranges = Vec::new();
        let mut run_start = None;
        for (i, member) in members.iter().enumerate() {
            let same = self.move_group(*member) == group;
            match (same, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    ranges.push(DropRange { start, end: i });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            ranges.push(DropRange {
                start,
                end: members.len(),
            });
        }
        if ranges.is_empty() {
            ranges.push(DropRange {
                start: 0,
                end: members.len(),
            });
        }
        ranges
    }

    /// Every collection that accepts `source`, with its legal positions.
    ///
    /// Candidates share the collection key of the source's parent. When the
    /// source lists allowed annotation parents, only collections in one of
    /// those annotation contexts qualify.
    pub fn find_allowed_drop_aggregations(&self, source: NodeId) -> Vec<DropTarget> {
        if !self.can_drag(source) {
            return Vec::new();
        }
        let Some(tag) = self
            .parent(source)
            .and_then(|p| kinds::collection_tag(self, p))
        else {
            return Vec::new();
        };
        let allowed = &self.node(source).allowed_drop_parents;

        self.descendants(self.root())
            .into_iter()
            .filter(|c| kinds::collection_tag(self, *c).as_deref() == Some(tag.as_str()))
            .filter(|c| {
                allowed.is_empty()
                    || self
                        .node(*c)
                        .annotation_context
                        .as_ref()
                        .is_some_and(|ctx| allowed.contains(ctx))
            })
            .filter_map(|collection| {
                let ranges = self.allowed_drop_range(source, collection);
                (!ranges.is_empty()).then_some(DropTarget { collection, ranges })
            })
            .collect()
    }
}
