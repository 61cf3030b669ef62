//! Node kinds and their behavior table.
//!
//! Every node carries a [`NodeKind`] tag. The handful of behaviors that
//! differ between kinds are dispatched through [`KindOps`], one static
//! function table per kind.
//!
//! ## Submodules
//!
//! - [`section`] - Sections and custom section placement
//! - [`table`] - Tables, columns and column extension types
//! - [`anchor`] - Anchored custom actions and filter fields
//! - [`view`] - Multi-view collections

/// Anchored custom actions and filter fields.
pub mod anchor;

/// Sections and custom section placement.
pub mod section;

/// Tables, columns and column extension types.
pub mod table;

/// Multi-view collections.
pub mod view;

use serde::Serialize;

use crate::{
    annotation::AnnotationIndex,
    config::ModelOptions,
    i18n::{I18nBundle, format_key},
    tree::{NodeId, PathSegment, Tree, Variant},
};

pub use anchor::AnchorData;
pub use section::{RelativePosition, SectionData};
pub use table::{ColumnData, ColumnExtension, TableType};

/// Discriminator of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// Root of the page.
    Page,
    Object,
    Array,
    /// Object created from an `additionalProperties` template.
    AdditionalObject,
    /// Array of scalar items.
    Atomic,
    /// Synthetic child holding one scalar item.
    AtomicItem,
    Sections,
    Section,
    Table,
    Columns,
    Column,
    Actions,
    Action,
    Fields,
    Field,
    FilterFields,
    FilterField,
    Views,
    View,
    Chart,
    VisualFilters,
    VisualFilter,
    BuildingBlockRoot,
}

/// Derived, kind-specific data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum KindData {
    #[default]
    None,
    Section(SectionData),
    Table { table_type: TableType },
    Column(ColumnData),
    Anchor(AnchorData),
}

/// What the kind hooks may consult.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub annotations: &'a AnnotationIndex<'a>,
    pub options: &'a ModelOptions,
}

/// Behavior table of one kind.
pub struct KindOps {
    /// Members are sortable and tagged with the collection key.
    pub collection: bool,
    /// Kind used for children no factory predicate claims.
    pub child_kind: Option<NodeKind>,
    /// Shown in the outline by default.
    pub view_node: bool,
    pub display_name: fn(&Tree, NodeId, &I18nBundle) -> String,
    pub technical_name: fn(&Tree, NodeId) -> Option<String>,
    /// Runs after values and annotation data are assigned.
    pub on_values_updated: fn(&mut Tree, NodeId, &HookContext<'_>),
    /// Runs after the validator has settled states.
    pub after_validation: fn(&mut Tree, NodeId, &HookContext<'_>),
    /// Move group used by drop range computation.
    pub move_group: fn(&Tree, NodeId) -> Option<String>,
}

fn no_hook(_: &mut Tree, _: NodeId, _: &HookContext<'_>) {}

fn no_technical_name(_: &Tree, _: NodeId) -> Option<String> {
    None
}

const GENERIC: KindOps = KindOps {
    collection: false,
    child_kind: None,
    view_node: false,
    display_name: generic_display_name,
    technical_name: no_technical_name,
    on_values_updated: no_hook,
    after_validation: no_hook,
    move_group: parent_collection_tag,
};

const OUTLINE: KindOps = KindOps {
    view_node: true,
    ..GENERIC
};

const fn collection(child: NodeKind) -> KindOps {
    KindOps {
        collection: true,
        child_kind: Some(child),
        ..OUTLINE
    }
}

static PAGE: KindOps = OUTLINE;
static OBJECT: KindOps = GENERIC;
static ATOMIC_ITEM: KindOps = KindOps {
    technical_name: atomic_item_name,
    ..GENERIC
};
static SECTIONS: KindOps = KindOps {
    after_validation: section::protect_referenced_section,
    ..collection(NodeKind::Section)
};
static SECTION: KindOps = KindOps {
    display_name: section::display_name,
    technical_name: section::technical_name,
    on_values_updated: section::on_values_updated,
    ..OUTLINE
};
static TABLE: KindOps = KindOps {
    on_values_updated: table::on_table_values_updated,
    ..OUTLINE
};
static COLUMNS: KindOps = collection(NodeKind::Column);
static COLUMN: KindOps = KindOps {
    technical_name: composite_technical_name,
    on_values_updated: table::on_column_values_updated,
    move_group: table::column_move_group,
    ..OUTLINE
};
static ACTIONS: KindOps = collection(NodeKind::Action);
static ANCHORED: KindOps = KindOps {
    technical_name: composite_technical_name,
    on_values_updated: anchor::on_values_updated,
    ..OUTLINE
};
static FIELDS: KindOps = collection(NodeKind::Field);
static FIELD: KindOps = KindOps {
    technical_name: composite_technical_name,
    ..OUTLINE
};
static FILTER_FIELDS: KindOps = collection(NodeKind::FilterField);
static VIEWS: KindOps = KindOps {
    after_validation: view::restrict_view_deletion,
    ..collection(NodeKind::View)
};
static VIEW: KindOps = KindOps {
    technical_name: view::technical_name,
    ..OUTLINE
};
static CHART: KindOps = KindOps {
    technical_name: control_technical_name,
    ..OUTLINE
};
static VISUAL_FILTERS: KindOps = collection(NodeKind::VisualFilter);
static BUILDING_BLOCK: KindOps = KindOps {
    technical_name: building_block_technical_name,
    ..OUTLINE
};

impl NodeKind {
    /// The behavior table of this kind.
    pub fn ops(self) -> &'static KindOps {
        match self {
            NodeKind::Page => &PAGE,
            NodeKind::Object | NodeKind::Array | NodeKind::AdditionalObject | NodeKind::Atomic => {
                &OBJECT
            }
            NodeKind::AtomicItem => &ATOMIC_ITEM,
            NodeKind::Sections => &SECTIONS,
            NodeKind::Section => &SECTION,
            NodeKind::Table => &TABLE,
            NodeKind::Columns => &COLUMNS,
            NodeKind::Column => &COLUMN,
            NodeKind::Actions => &ACTIONS,
            NodeKind::Action | NodeKind::FilterField => &ANCHORED,
            NodeKind::Fields => &FIELDS,
            NodeKind::Field | NodeKind::VisualFilter => &FIELD,
            NodeKind::FilterFields => &FILTER_FIELDS,
            NodeKind::Views => &VIEWS,
            NodeKind::View => &VIEW,
            NodeKind::Chart => &CHART,
            NodeKind::VisualFilters => &VISUAL_FILTERS,
            NodeKind::BuildingBlockRoot => &BUILDING_BLOCK,
        }
    }

    /// Whether members of this kind form a sortable collection.
    pub fn is_collection(self) -> bool {
        self.ops().collection
    }
}

/// Default label resolution.
///
/// Tries the declared name, title and description through the bundle, then
/// the kind's technical name, then a formatted key.
pub fn generic_display_name(tree: &Tree, id: NodeId, bundle: &I18nBundle) -> String {
    let d = &tree.node(id).descriptive;
    [
        d.display_name.as_deref(),
        d.title.as_deref(),
        d.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(|text| bundle.resolve_text(text))
    .find(|text| !text.trim().is_empty())
    .or_else(|| tree.technical_name(id).filter(|t| !t.is_empty()))
    .unwrap_or_else(|| key_label(tree, id))
}

/// Formatted key of a node.
///
/// Array items of a node with several alternative shapes that share no
/// top-level key are labelled after the first child key found.
pub fn key_label(tree: &Tree, id: NodeId) -> String {
    let node = tree.node(id);
    match node.path.last() {
        Some(PathSegment::Index(i)) => {
            if node.variants.len() > 1
                && !variants_share_key(&node.variants)
                && let Some(first) = first_child_key(tree, id)
            {
                return format_key(&first);
            }
            format!("Item {}", i + 1)
        }
        _ => format_key(&node.key),
    }
}

fn variants_share_key(variants: &[Variant]) -> bool {
    let Some((first, rest)) = variants.split_first() else {
        return false;
    };
    first
        .properties
        .keys()
        .chain(first.children.keys())
        .any(|key| rest.iter().all(|v| v.declares(key)))
}

fn first_child_key(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    let with_value = node
        .children
        .iter()
        .find(|(_, c)| tree.node(**c).has_value())
        .map(|(k, _)| k.clone())
        .or_else(|| {
            node.properties
                .iter()
                .find(|(_, p)| p.has_value())
                .map(|(k, _)| k.clone())
        });
    with_value.or_else(|| node.children.keys().next().cloned())
}

/// Move group of a plain collection member: the collection key.
pub fn parent_collection_tag(tree: &Tree, id: NodeId) -> Option<String> {
    let parent = tree.parent(id)?;
    collection_tag(tree, parent)
}

/// The sortable-collection tag of a collection node.
pub fn collection_tag(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    node.kind.is_collection().then(|| node.key.clone())
}

/// Parse an annotation composite key such as `DataField::Price` or
/// `DataFieldForAction::Service.Approve`.
pub fn parse_composite_key(key: &str) -> Option<&str> {
    let (_, tail) = key.rsplit_once("::")?;
    let tail = tail.split('#').next().unwrap_or(tail);
    let name = tail.rsplit('.').next().unwrap_or(tail);
    (!name.is_empty()).then_some(name)
}

fn composite_technical_name(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    let source = match node.path.last() {
        Some(PathSegment::Index(_)) => node
            .property_str("key")
            .or_else(|| node.property_str("value"))?,
        _ => node.key.as_str(),
    };
    // The last declared key entry is the most specific one.
    parse_composite_key(source)
        .or_else(|| {
            let value = node.schema.keys.last()?.value.as_str();
            Some(parse_composite_key(value).unwrap_or(value))
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn control_technical_name(tree: &Tree, id: NodeId) -> Option<String> {
    let schema = &tree.node(id).schema;
    schema
        .control_name()
        .map(|c| c.rsplit('.').next().unwrap_or(c).to_string())
        .or_else(|| schema.element_type().map(str::to_string))
}

fn building_block_technical_name(tree: &Tree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    let element = node.schema.element_type()?;
    Some(format!("{element} ({})", node.key))
}

fn atomic_item_name(tree: &Tree, id: NodeId) -> Option<String> {
    match tree.node(id).value.as_ref()? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
