//! The page edit model.
//!
//! [`PageEditModel`] owns the schema, the data, the annotation bundle and
//! the tree built from them. Building runs in this order:
//!
//! 1. the walker builds the schema skeleton
//! 2. data-only nodes are created from templates
//! 3. values, annotation links and default actions are assigned
//! 4. the validator settles node and property states
//! 5. view nodes are propagated for the outline

use serde_json::Value;

use crate::{
    annotation::{AnnotationBundle, AnnotationIndex},
    config::ModelOptions,
    error::{ModelError, Result},
    i18n::I18nBundle,
    kinds::{HookContext, NodeKind},
    schema::{SchemaDocument, SchemaFragment, SchemaType},
    tree::{
        ActionKind, DropRange, DropTarget, NodeId, SortMode, SupportedAction, Tree,
        ValidationState,
        values::update_values,
    },
    validator::AggregationValidator,
    walker::SchemaWalker,
};

/// Editable page model built from a schema, data and annotations.
#[derive(Debug)]
pub struct PageEditModel {
    schema: SchemaDocument,
    data: Value,
    annotations: AnnotationBundle,
    options: ModelOptions,
    tree: Tree,
    validator: AggregationValidator,
}

impl PageEditModel {
    /// Build the model.
    ///
    /// # Arguments
    ///
    /// * `schema` - Page schema with its `definitions` or `$defs`
    /// * `data` - Current page configuration
    /// * `annotations` - Annotation descriptors of the page
    /// * `options` - Construction options
    ///
    /// # Errors
    ///
    /// Fails when `data` does not have the root schema's type, on runaway
    /// schema recursion and on structural tree errors.
    pub fn new(
        schema: Value,
        data: Value,
        annotations: AnnotationBundle,
        options: ModelOptions,
    ) -> Result<Self> {
        let schema = SchemaDocument::new(schema);
        let root_fragment = SchemaFragment::parse(schema.root(), "/");
        check_root_data(&root_fragment, &data)?;
        let mut tree = Tree::new(NodeKind::Page, root_fragment);
        let root = tree.root();
        {
            let index = AnnotationIndex::new(&annotations);
            let walker = SchemaWalker::new(&schema, &index, &options);
            walker.parse_schema(&mut tree, root, schema.root(), None, 0)?;
        }
        info!("page skeleton built");

        let mut model = Self {
            schema,
            data,
            annotations,
            options,
            tree,
            validator: AggregationValidator::new(),
        };
        model.populate()?;
        Ok(model)
    }

    /// Replace the data and re-populate the tree.
    ///
    /// Dynamic nodes whose data key vanished are removed, new ones are
    /// created, and values and states are recomputed.
    ///
    /// # Errors
    ///
    /// Fails when `data` does not have the root schema's type, or when a
    /// template schema recurses without bound.
    pub fn update_data(&mut self, data: Value) -> Result<()> {
        check_root_data(&self.tree.node(self.tree.root()).schema, &data)?;
        self.data = data;
        self.populate()
    }

    /// Recompute states without touching values.
    pub fn revalidate(&mut self) {
        let Self {
            annotations,
            options,
            tree,
            validator,
            ..
        } = self;
        let index = AnnotationIndex::new(annotations);
        let ctx = HookContext {
            annotations: &index,
            options,
        };
        run_validation(tree, validator, &ctx);
    }

    fn populate(&mut self) -> Result<()> {
        let Self {
            schema,
            data,
            annotations,
            options,
            tree,
            validator,
        } = self;
        let index = AnnotationIndex::new(annotations);
        let walker = SchemaWalker::new(schema, &index, options);
        let root = tree.root();
        walker.populate_dynamic(tree, root, Some(&*data))?;

        let ctx = HookContext {
            annotations: &index,
            options,
        };
        update_values(tree, root, Some(&*data), &ctx);
        run_validation(tree, validator, &ctx);
        debug!("model populated");
        Ok(())
    }

    /// The tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable tree, for structural edit commands.
    ///
    /// Call [`PageEditModel::revalidate`] once the edit is complete.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The data the tree was last populated from.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn annotations(&self) -> &AnnotationBundle {
        &self.annotations
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    fn checked(&self, id: NodeId) -> Result<NodeId> {
        self.tree
            .get(id)
            .map(|n| n.id())
            .ok_or(ModelError::UnknownNode(id))
    }

    /// Outline label of a node.
    ///
    /// # Errors
    ///
    /// Fails for ids of another tree.
    pub fn display_name(&self, id: NodeId, bundle: &I18nBundle) -> Result<String> {
        let id = self.checked(id)?;
        Ok(self.tree.display_name(id, bundle))
    }

    /// Actions of a node, disabled ones included.
    ///
    /// # Errors
    ///
    /// Fails for ids of another tree.
    pub fn supported_actions(&self, id: NodeId) -> Result<&[SupportedAction]> {
        let id = self.checked(id)?;
        Ok(self.tree.node(id).supported_actions())
    }

    /// Legal positions of `id` inside its own collection.
    ///
    /// # Errors
    ///
    /// Fails for ids of another tree.
    pub fn allowed_drop_range(&self, id: NodeId) -> Result<Vec<DropRange>> {
        let id = self.checked(id)?;
        Ok(self
            .tree
            .parent(id)
            .map(|parent| self.tree.allowed_drop_range(id, parent))
            .unwrap_or_default())
    }

    /// Collections `id` may be dropped into.
    ///
    /// # Errors
    ///
    /// Fails for ids of another tree.
    pub fn find_allowed_drop_aggregations(&self, id: NodeId) -> Result<Vec<DropTarget>> {
        let id = self.checked(id)?;
        Ok(self.tree.find_allowed_drop_aggregations(id))
    }

    /// Move `id` to `position` of `target` if the drop is legal.
    ///
    /// Returns whether the node was moved. States are recomputed after a
    /// move.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and for targets that are not collections.
    /// Moving into a collection that already has a member under the same
    /// key is refused, not an error.
    pub fn move_node(&mut self, id: NodeId, target: NodeId, position: usize) -> Result<bool> {
        let id = self.checked(id)?;
        let target = self.checked(target)?;
        if !self.tree.node(target).kind.is_collection() {
            return Err(ModelError::NotACollection {
                path: self.tree.node(target).path.to_string(),
            });
        }
        let legal = self
            .tree
            .allowed_drop_range(id, target)
            .iter()
            .any(|r| r.contains(position));
        if !legal {
            debug!("refused to move {} to {position}", self.tree.node(id).path);
            return Ok(false);
        }

        if self.tree.parent(id) == Some(target) {
            self.tree.move_child(id, position)?;
        } else {
            let segment = self
                .tree
                .node(id)
                .path
                .last()
                .cloned()
                .unwrap_or_else(|| self.tree.node(id).key.as_str().into());
            self.tree.detach(id);
            self.tree.add_child(target, segment, id, Some(position))?;
        }
        self.revalidate();
        Ok(true)
    }

    /// Data value rebuilt from the tree.
    pub fn to_value(&self) -> Value {
        self.tree.to_value(self.tree.root())
    }
}

/// Page data must be an object or array when the root schema says so.
/// `null` stands for an empty page.
fn check_root_data(root: &SchemaFragment, data: &Value) -> Result<()> {
    let expected = match root.schema_type {
        Some(SchemaType::Object) if !data.is_object() => "object",
        Some(SchemaType::Array) if !data.is_array() => "array",
        _ => return Ok(()),
    };
    if data.is_null() {
        return Ok(());
    }
    let actual = match data {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Err(ModelError::TypeMismatch {
        path: "/".to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn run_validation(tree: &mut Tree, validator: &AggregationValidator, ctx: &HookContext<'_>) {
    let root = tree.root();
    let nodes = tree.descendants(root);
    for &id in &nodes {
        let node = tree.node_mut(id);
        node.state = if node.inactive {
            ValidationState::Invalid
        } else {
            ValidationState::Valid
        };
        for property in node.properties.values_mut() {
            property.state = ValidationState::Valid;
        }
    }

    validator.validate_subtree(tree, root);

    for &id in &nodes {
        let node = tree.node_mut(id);
        let removable = node.custom || (!node.locked && node.sortable != SortMode::ReadOnly);
        if node.state == ValidationState::Invalid && node.has_value() && removable {
            node.remove_action(ActionKind::Delete);
            node.add_action(ActionKind::Delete);
        }
    }
    for &id in &nodes {
        let hook = tree.node(id).kind.ops().after_validation;
        hook(tree, id, ctx);
    }

    propagate_view_nodes(tree, root);
}

/// A node is shown in the outline when it is visible and it or any
/// descendant is a view node.
fn propagate_view_nodes(tree: &mut Tree, id: NodeId) -> bool {
    let mut below = false;
    for child in tree.children(id) {
        below |= propagate_view_nodes(tree, child);
    }
    let node = tree.node_mut(id);
    let own = node
        .descriptive
        .is_view_node
        .unwrap_or(node.kind.ops().view_node);
    node.view_node = node.visible && (own || below);
    node.view_node
}
