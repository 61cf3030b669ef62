//! Tables and columns.

use std::fmt;

use serde::Serialize;

use crate::tree::{NodeId, Tree};

use super::{HookContext, KindData, NodeKind};

/// Table flavor, read from the table's `type` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TableType {
    #[default]
    Responsive,
    Grid,
    Analytical,
    Tree,
}

impl TableType {
    /// Parse a table type value such as `GridTable`.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "ResponsiveTable" => Self::Responsive,
            "GridTable" => Self::Grid,
            "AnalyticalTable" => Self::Analytical,
            "TreeTable" => Self::Tree,
            _ => return None,
        })
    }

    /// Column extension type that fits this table.
    pub fn column_extension(self) -> ColumnExtension {
        match self {
            Self::Responsive => ColumnExtension::Responsive,
            Self::Grid => ColumnExtension::Grid,
            Self::Analytical => ColumnExtension::Analytical,
            Self::Tree => ColumnExtension::Tree,
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Responsive => "ResponsiveTable",
            Self::Grid => "GridTable",
            Self::Analytical => "AnalyticalTable",
            Self::Tree => "TreeTable",
        };
        f.write_str(name)
    }
}

/// Declared extension type of a user-authored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnExtension {
    Responsive,
    Grid,
    Analytical,
    Tree,
}

impl ColumnExtension {
    /// Parse an extension type such as `GridTableColumnsExtension`.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "ResponsiveTableColumnsExtension" => Self::Responsive,
            "GridTableColumnsExtension" => Self::Grid,
            "AnalyticalTableColumnsExtension" => Self::Analytical,
            "TreeTableColumnsExtension" => Self::Tree,
            _ => return None,
        })
    }
}

/// Derived data of a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnData {
    pub extension: Option<ColumnExtension>,
    /// Shows an action button rather than a field.
    pub action_like: bool,
}

const ACTION_COLUMN_TYPES: [&str; 3] = [
    "ForAction",
    "DataFieldForAction",
    "DataFieldForIntentBasedNavigation",
];

/// Table type of a table node; unknown values fall back to responsive.
pub fn table_type_of(tree: &Tree, table: NodeId) -> TableType {
    let node = tree.node(table);
    if let KindData::Table { table_type } = node.data {
        return table_type;
    }
    node.property_str("type")
        .and_then(TableType::parse)
        .unwrap_or_default()
}

pub(super) fn on_table_values_updated(tree: &mut Tree, id: NodeId, _: &HookContext<'_>) {
    let node = tree.node(id);
    let table_type = node
        .property_str("type")
        .and_then(TableType::parse)
        .unwrap_or_default();
    tree.node_mut(id).data = KindData::Table { table_type };
}

pub(super) fn on_column_values_updated(tree: &mut Tree, id: NodeId, _: &HookContext<'_>) {
    let node = tree.node(id);
    let action_like = node
        .property_str("type")
        .is_some_and(|t| ACTION_COLUMN_TYPES.contains(&t))
        || ACTION_COLUMN_TYPES
            .iter()
            .any(|t| node.key.starts_with(&format!("{t}::")));
    let declared = node.property_str("extensionType").map(str::to_string);
    let extension = declared.as_deref().and_then(ColumnExtension::parse);
    let custom = node.custom;
    let table_type = tree
        .ancestor_of_kind(id, NodeKind::Table)
        .map(|table| table_type_of(tree, table));

    tree.node_mut(id).data = KindData::Column(ColumnData {
        extension,
        action_like,
    });

    if !custom {
        return;
    }
    if let (Some(declared), Some(table_type)) = (declared, table_type)
        && extension != Some(table_type.column_extension())
    {
        debug!(
            "column {} declares {declared} inside a {table_type}",
            tree.node(id).path
        );
        tree.node_mut(id).reject(format!(
            "Column extension `{declared}` does not match the {table_type} table"
        ));
    }
}

pub(super) fn column_move_group(tree: &Tree, id: NodeId) -> Option<String> {
    match &tree.node(id).data {
        KindData::Column(ColumnData {
            action_like: true, ..
        }) => Some("actions".to_string()),
        _ => super::parent_collection_tag(tree, id),
    }
}
