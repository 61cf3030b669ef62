//! The generic aggregation node.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::{
    annotation::SourceLocation,
    kinds::{KindData, NodeKind},
    schema::{Message, SchemaFragment},
};

use super::{
    NodeId, NodePath,
    property::{Descriptive, Property, ValidationState, Variant},
};

/// Structural edit a node supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    /// Add a new member to this collection.
    Add,
    Delete,
    Move,
    /// Navigate to the source definition.
    OpenSource,
}

/// An action and, when disabled, the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedAction {
    pub kind: ActionKind,
    pub disabled_reason: Option<String>,
}

impl SupportedAction {
    /// Whether the action can be executed.
    pub fn is_enabled(&self) -> bool {
        self.disabled_reason.is_none()
    }
}

/// Drag-and-drop capability of a collection member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortMode {
    /// Not part of a sortable collection.
    #[default]
    None,
    Movable,
    /// Shown in a sortable collection but pinned in place.
    ReadOnly,
}

/// Origin of a dynamic-children template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    AdditionalProperties,
    PatternProperties(String),
    Items,
}

/// Schema for children that only exist once data names them.
#[derive(Debug, Clone)]
pub struct Template {
    pub source: TemplateSource,
    pub schema: Value,
    pattern: Option<Regex>,
}

impl Template {
    /// `additionalProperties` template.
    pub fn additional(schema: Value) -> Self {
        Self {
            source: TemplateSource::AdditionalProperties,
            schema,
            pattern: None,
        }
    }

    /// Shared `items` template.
    pub fn items(schema: Value) -> Self {
        Self {
            source: TemplateSource::Items,
            schema,
            pattern: None,
        }
    }

    /// `patternProperties` template.
    pub fn pattern(pattern: &str, schema: Value) -> crate::Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| crate::ModelError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: TemplateSource::PatternProperties(pattern.to_string()),
            schema,
            pattern: Some(regex),
        })
    }

    /// Whether an object key is governed by this template.
    pub fn matches_key(&self, key: &str) -> bool {
        match &self.source {
            TemplateSource::AdditionalProperties => true,
            TemplateSource::PatternProperties(_) => {
                self.pattern.as_ref().is_some_and(|re| re.is_match(key))
            }
            TemplateSource::Items => false,
        }
    }
}

/// One node of the page tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    /// Key under the parent.
    pub key: String,
    /// Location in schema and data space.
    pub path: NodePath,
    pub kind: NodeKind,
    /// Kind-specific derived data.
    pub data: KindData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: IndexMap<String, NodeId>,
    /// Position among siblings.
    pub order: usize,
    pub properties: IndexMap<String, Property>,
    pub variants: Vec<Variant>,
    /// Union aggregation name to its source keys.
    pub unions: IndexMap<String, Vec<String>>,
    pub value: Option<Value>,
    pub state: ValidationState,
    /// Retained but not applied (failed extension validation).
    pub inactive: bool,
    pub actions: Vec<SupportedAction>,
    pub sortable: SortMode,
    /// Authored by the user rather than derived from annotations.
    pub custom: bool,
    /// Created from a template for a data-only key.
    pub dynamic: bool,
    /// Own annotation node id.
    pub annotation_link: Option<String>,
    /// Own annotation id, or the nearest ancestor's.
    pub annotation_context: Option<String>,
    /// Generated node under a read-only annotation; delete and move are
    /// disabled.
    pub locked: bool,
    pub allowed_drop_parents: Vec<String>,
    pub location: Option<SourceLocation>,
    /// Copy of the governing fragment.
    pub schema: SchemaFragment,
    pub descriptive: Descriptive,
    pub templates: Vec<Template>,
    /// Extension validation messages.
    pub messages: Vec<Message>,
    /// Matches a structural path that accepts new members.
    pub addable: bool,
    /// Shown in the outline.
    pub view_node: bool,
    /// Cleared when a user-authored sibling replaces this node.
    pub visible: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, key: String, schema: SchemaFragment) -> Self {
        Self {
            id,
            key,
            path: NodePath::root(),
            kind,
            data: KindData::None,
            parent: None,
            children: IndexMap::new(),
            order: 0,
            properties: IndexMap::new(),
            variants: Vec::new(),
            unions: IndexMap::new(),
            value: None,
            state: ValidationState::Valid,
            inactive: false,
            actions: Vec::new(),
            sortable: SortMode::None,
            custom: false,
            dynamic: false,
            annotation_link: None,
            annotation_context: None,
            locked: false,
            allowed_drop_parents: Vec::new(),
            location: None,
            schema,
            descriptive: Descriptive::default(),
            templates: Vec::new(),
            messages: Vec::new(),
            addable: false,
            view_node: false,
            visible: true,
        }
    }

    /// Id of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent id; `None` for the root and detached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids by key, in insertion order.
    pub fn children(&self) -> &IndexMap<String, NodeId> {
        &self.children
    }

    /// Whether a non-null value is set.
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_null())
    }

    /// A property value as string.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_str)
            .or_else(|| self.value.as_ref()?.get(name)?.as_str())
    }

    /// Actions for the outline, including disabled ones.
    pub fn supported_actions(&self) -> &[SupportedAction] {
        &self.actions
    }

    /// The action of the given kind.
    pub fn action(&self, kind: ActionKind) -> Option<&SupportedAction> {
        self.actions.iter().find(|a| a.kind == kind)
    }

    /// Whether the action exists and is enabled.
    pub fn can(&self, kind: ActionKind) -> bool {
        self.action(kind).is_some_and(SupportedAction::is_enabled)
    }

    /// Add an enabled action unless present.
    pub fn add_action(&mut self, kind: ActionKind) {
        if self.action(kind).is_none() {
            self.actions.push(SupportedAction {
                kind,
                disabled_reason: None,
            });
        }
    }

    pub fn remove_action(&mut self, kind: ActionKind) {
        self.actions.retain(|a| a.kind != kind);
    }

    /// Disable an existing action. Missing actions stay missing.
    pub fn disable_action(&mut self, kind: ActionKind, reason: &str) {
        if let Some(action) = self.actions.iter_mut().find(|a| a.kind == kind)
            && action.disabled_reason.is_none()
        {
            action.disabled_reason = Some(reason.to_string());
        }
    }

    /// Mark the node invalid and inactive with a deletable warning.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.state = ValidationState::Invalid;
        self.inactive = true;
        self.messages.push(Message::deletable_warning(message));
    }
}
