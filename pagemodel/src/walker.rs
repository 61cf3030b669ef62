//! Schema traversal.
//!
//! [`SchemaWalker::parse_schema`] turns a schema fragment into nodes and
//! properties of a [`Tree`]. Every fragment runs through an ordered list of
//! rules; a rule either lets the fragment continue to the next rule or stops
//! its traversal.
//!
//! Data-only children governed by `additionalProperties`,
//! `patternProperties` or a shared `items` schema are created later by
//! [`SchemaWalker::populate_dynamic`], once the data is known.

use serde_json::Value;

use crate::{
    annotation::AnnotationIndex,
    config::ModelOptions,
    error::{ModelError, Result},
    factory::NodeFactory,
    kinds::NodeKind,
    schema::{Items, SchemaDocument, SchemaFragment, SchemaType},
    tree::{NodeId, NodePath, PathSegment, Template, TemplateSource, Tree, Variant},
};

/// Where the keywords of the current fragment end up.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    Node,
    Property(String),
}

/// Result of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Traversal state of one fragment.
struct Frame {
    node: NodeId,
    raw: Value,
    fragment: SchemaFragment,
    key: Option<PathSegment>,
    path: NodePath,
    depth: usize,
    ref_depth: usize,
    target: Target,
    dynamic: bool,
}

type Rule = fn(&SchemaWalker<'_>, &mut Tree, &mut Frame) -> Result<Flow>;

const RULES: &[(&str, Rule)] = &[
    ("const", const_as_enum),
    ("hidden", skip_hidden),
    ("classify", classify),
    ("annotation", link_annotation),
    ("ref", follow_reference),
    ("anyOf", expand_any_of),
    ("properties", walk_properties),
    ("items", walk_items),
    ("descriptive", copy_descriptive),
    ("templates", register_templates),
    ("finish", finish),
];

/// Walks schema fragments into a [`Tree`].
#[derive(Clone, Copy)]
pub struct SchemaWalker<'a> {
    schema: &'a SchemaDocument,
    annotations: &'a AnnotationIndex<'a>,
    options: &'a ModelOptions,
    factory: NodeFactory,
    /// Scratch parses only capture shape: no variants, no annotation links.
    scratch: bool,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(
        schema: &'a SchemaDocument,
        annotations: &'a AnnotationIndex<'a>,
        options: &'a ModelOptions,
    ) -> Self {
        Self {
            schema,
            annotations,
            options,
            factory: NodeFactory,
            scratch: false,
        }
    }

    /// Parse `fragment` into `node`.
    ///
    /// With a `key`, the fragment describes a member of `node`: a property
    /// or a child aggregation. Without one, it describes `node` itself.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RecursionLimit`] when the traversal goes deeper
    /// than [`ModelOptions::max_depth`], and structural tree errors.
    pub fn parse_schema(
        &self,
        tree: &mut Tree,
        node: NodeId,
        fragment: &Value,
        key: Option<PathSegment>,
        depth: usize,
    ) -> Result<()> {
        self.parse(tree, node, fragment.clone(), key, depth, 0, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse(
        &self,
        tree: &mut Tree,
        node: NodeId,
        raw: Value,
        key: Option<PathSegment>,
        depth: usize,
        ref_depth: usize,
        dynamic: bool,
    ) -> Result<()> {
        let base = &tree.get(node).ok_or(ModelError::UnknownNode(node))?.path;
        let path = match &key {
            Some(k) => base.child(k.clone()),
            None => base.clone(),
        };
        if depth > self.options.max_depth {
            return Err(ModelError::RecursionLimit {
                path: path.to_string(),
                limit: self.options.max_depth,
            });
        }

        let location = path.to_string();
        let mut frame = Frame {
            node,
            fragment: SchemaFragment::parse(&raw, &location),
            raw,
            key,
            path,
            depth,
            ref_depth,
            target: Target::Node,
            dynamic,
        };
        for (name, rule) in RULES {
            if rule(self, tree, &mut frame)? == Flow::Stop {
                trace!("{}: stopped at rule `{name}`", frame.path);
                break;
            }
        }
        Ok(())
    }

    /// Find or create the child aggregation `key` of `parent`.
    ///
    /// A `union` keyword files the child under its logical name and records
    /// `key` as one of its data sources.
    fn select_or_create(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        key: &PathSegment,
        fragment: SchemaFragment,
        dynamic: bool,
    ) -> Result<NodeId> {
        let (segment, source) = match (&fragment.union, key) {
            (Some(logical), PathSegment::Key(source)) => {
                (PathSegment::Key(logical.clone()), Some(source.clone()))
            }
            _ => (key.clone(), None),
        };
        let name = segment.to_string();
        if let Some(source) = source {
            let sources = tree.node_mut(parent).unions.entry(name.clone()).or_default();
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        if let Some(existing) = tree.child(parent, &name) {
            return Ok(existing);
        }
        let path = tree.node(parent).path.child(segment.clone());
        let child = self.factory.create(tree, parent, &path, fragment, dynamic);
        tree.add_child(parent, segment, child, None)?;
        debug!("created {:?} at {path}", tree.node(child).kind);
        Ok(child)
    }

    /// Build one [`Variant`] per `anyOf` alternative from scratch parses.
    fn build_variants(
        &self,
        tree: &Tree,
        target: NodeId,
        alternatives: &[Value],
        depth: usize,
    ) -> Result<Vec<Variant>> {
        let scratch = Self {
            scratch: true,
            ..*self
        };
        let template = tree.node(target);
        alternatives
            .iter()
            .enumerate()
            .map(|(i, alternative)| {
                let mut shadow = Tree::with_root_path(
                    template.kind,
                    template.schema.clone(),
                    template.path.clone(),
                );
                let root = shadow.root();
                scratch.parse(&mut shadow, root, alternative.clone(), None, depth, 0, false)?;
                Ok(Variant::from_tree(&shadow, root, variant_name(alternative, i)))
            })
            .collect()
    }

    /// Create data-only children of the subtree at `id` from its templates.
    ///
    /// Children and properties whose data key vanished are removed again.
    ///
    /// # Errors
    ///
    /// Propagates traversal errors of the template schemas.
    pub fn populate_dynamic(
        &self,
        tree: &mut Tree,
        id: NodeId,
        data: Option<&Value>,
    ) -> Result<()> {
        let depth = tree.node(id).path.len();
        match data {
            Some(Value::Object(map)) if !tree.node(id).templates.is_empty() => {
                for key in map.keys() {
                    let node = tree.node(id);
                    if node.children.contains_key(key)
                        || node.properties.contains_key(key)
                        || node.unions.values().flatten().any(|s| s == key)
                    {
                        continue;
                    }
                    let Some(schema) = object_template(&node.templates, key) else {
                        continue;
                    };
                    trace!("{}: dynamic key `{key}`", node.path);
                    let key = Some(PathSegment::Key(key.clone()));
                    self.parse(tree, id, schema, key, depth + 1, 0, true)?;
                }
            }
            Some(Value::Array(items)) if tree.node(id).kind != NodeKind::Atomic => {
                let shared = tree
                    .node(id)
                    .templates
                    .iter()
                    .find(|t| t.source == TemplateSource::Items)
                    .map(|t| t.schema.clone());
                if let Some(schema) = shared {
                    for i in 0..items.len() {
                        if tree.child(id, &i.to_string()).is_none() {
                            let key = Some(PathSegment::Index(i));
                            self.parse(tree, id, schema.clone(), key, depth + 1, 0, true)?;
                        }
                    }
                }
            }
            _ => {}
        }

        remove_stale(tree, id, data);

        for child in tree.children(id) {
            let slice = dynamic_slice(tree, id, child, data);
            self.populate_dynamic(tree, child, slice)?;
        }
        Ok(())
    }
}

fn variant_name(alternative: &Value, index: usize) -> String {
    alternative
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(SchemaDocument::reference_name)
        .or_else(|| alternative.get("title").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("variant{index}"))
}

/// Template schema for an object key; `patternProperties` go first.
fn object_template(templates: &[Template], key: &str) -> Option<Value> {
    templates
        .iter()
        .filter(|t| matches!(t.source, TemplateSource::PatternProperties(_)))
        .chain(
            templates
                .iter()
                .filter(|t| t.source == TemplateSource::AdditionalProperties),
        )
        .find(|t| t.matches_key(key))
        .map(|t| t.schema.clone())
}

fn dynamic_slice<'v>(
    tree: &Tree,
    id: NodeId,
    child: NodeId,
    data: Option<&'v Value>,
) -> Option<&'v Value> {
    let data = data?;
    let key = &tree.node(child).key;
    if let Some(sources) = tree.node(id).unions.get(key) {
        return sources.iter().find_map(|s| data.get(s.as_str()));
    }
    match tree.node(child).path.last()? {
        PathSegment::Key(k) => data.get(k.as_str()),
        PathSegment::Index(i) => data.get(*i),
    }
}

/// Drop dynamic children and properties whose data key is gone.
fn remove_stale(tree: &mut Tree, id: NodeId, data: Option<&Value>) {
    let present = |segment: Option<&PathSegment>| match (segment, data) {
        (Some(PathSegment::Key(k)), Some(Value::Object(map))) => map.contains_key(k),
        (Some(PathSegment::Index(i)), Some(Value::Array(items))) => *i < items.len(),
        _ => false,
    };
    let stale: Vec<NodeId> = tree
        .children(id)
        .into_iter()
        .filter(|c| {
            let child = tree.node(*c);
            child.dynamic && !present(child.path.last())
        })
        .collect();
    for child in stale {
        debug!("removing stale dynamic node {}", tree.node(child).path);
        tree.detach(child);
    }

    let node = tree.node_mut(id);
    node.properties.retain(|name, p| {
        !p.dynamic || present(Some(&PathSegment::Key(name.clone())))
    });
}

fn const_as_enum(_: &SchemaWalker<'_>, _: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if frame.fragment.enum_values.is_none()
        && let Some(value) = frame.fragment.const_value.clone()
    {
        frame.fragment.enum_values = Some(vec![value]);
    }
    Ok(Flow::Continue)
}

fn skip_hidden(_: &SchemaWalker<'_>, _: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    Ok(if frame.fragment.hidden {
        Flow::Stop
    } else {
        Flow::Continue
    })
}

fn classify(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    let Some(key) = frame.key.clone() else {
        return Ok(Flow::Continue);
    };
    let fragment = &frame.fragment;
    if fragment.reference.is_some() || !fragment.any_of.is_empty() {
        return Ok(Flow::Continue);
    }
    if fragment.is_aggregation() {
        let child = w.select_or_create(tree, frame.node, &key, fragment.clone(), frame.dynamic)?;
        let raw = std::mem::take(&mut frame.raw);
        w.parse(
            tree,
            child,
            raw,
            None,
            frame.depth + 1,
            frame.ref_depth,
            frame.dynamic,
        )?;
        return Ok(Flow::Stop);
    }

    let name = key.to_string();
    let property = tree.add_property(frame.node, name.clone(), &frame.fragment);
    property.dynamic = frame.dynamic;
    frame.target = Target::Property(name);
    Ok(Flow::Continue)
}

fn link_annotation(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if w.scratch || frame.key.is_some() || frame.target != Target::Node {
        return Ok(Flow::Continue);
    }
    let node = tree.node(frame.node);
    if node.annotation_link.is_some() {
        return Ok(Flow::Continue);
    }
    let fragment = &frame.fragment;
    let link = fragment
        .metadata_id()
        .map(str::to_string)
        .or_else(|| {
            let path = fragment.annotation_path.as_deref()?;
            w.annotations.by_annotation_path(path).map(|n| n.id.clone())
        })
        .or_else(|| {
            (node.kind == NodeKind::BuildingBlockRoot)
                .then(|| w.annotations.find_building_block(&node.key))
                .flatten()
                .map(|n| n.id.clone())
        });
    let Some(link) = link else {
        return Ok(Flow::Continue);
    };
    if w.annotations.get(&link).is_none() {
        warn!("{}: annotation `{link}` is not in the bundle", frame.path);
    }
    let location = w.annotations.get(&link).and_then(|n| n.location.clone());
    let node = tree.node_mut(frame.node);
    node.annotation_link = Some(link);
    if location.is_some() {
        node.location = location;
    }
    Ok(Flow::Continue)
}

fn follow_reference(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    let Some(reference) = frame.fragment.reference.clone() else {
        return Ok(Flow::Continue);
    };
    let Some((name, definition)) = w.schema.resolve(&reference) else {
        warn!("{}: unresolved reference `{reference}`", frame.path);
        return Ok(Flow::Stop);
    };
    trace!("{}: following `{name}`", frame.path);
    let merged = SchemaDocument::merge_ref(&frame.raw, definition);
    w.parse(
        tree,
        frame.node,
        merged,
        frame.key.clone(),
        frame.depth + 1,
        frame.ref_depth + 1,
        frame.dynamic,
    )?;
    Ok(Flow::Stop)
}

fn expand_any_of(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if frame.fragment.any_of.is_empty() {
        return Ok(Flow::Continue);
    }
    let alternatives = std::mem::take(&mut frame.fragment.any_of);
    let limit = w.options.max_depth;
    let shapes: Vec<SchemaFragment> = alternatives
        .iter()
        .map(|a| SchemaFragment::parse(&w.schema.shallow_resolve(a, limit), "anyOf"))
        .collect();

    let target = match frame.key.clone() {
        Some(key) if shapes.iter().all(|s| !s.is_aggregation() && s.any_of.is_empty()) => {
            let merged = scalar_union(&frame.fragment, &shapes);
            let name = key.to_string();
            let property = tree.add_property(frame.node, name.clone(), &merged);
            property.dynamic = frame.dynamic;
            frame.fragment = merged;
            frame.target = Target::Property(name);
            return Ok(Flow::Continue);
        }
        Some(key) => {
            let mut shape = shapes.first().cloned().unwrap_or_default();
            shape.union = frame.fragment.union.clone().or(shape.union);
            w.select_or_create(tree, frame.node, &key, shape, frame.dynamic)?
        }
        None => frame.node,
    };

    for alternative in &alternatives {
        w.parse(
            tree,
            target,
            alternative.clone(),
            None,
            frame.depth + 1,
            frame.ref_depth,
            frame.dynamic,
        )?;
    }
    if alternatives.len() > 1 && !w.scratch {
        let variants = w.build_variants(tree, target, &alternatives, frame.depth + 1)?;
        debug!("{}: {} variants", tree.node(target).path, variants.len());
        tree.node_mut(target).variants = variants;
    }

    if target != frame.node {
        frame.node = target;
        frame.key = None;
        frame.path = tree.node(target).path.clone();
        frame.ref_depth = 0;
    }
    Ok(Flow::Continue)
}

/// One property for an `anyOf` of scalars: enums are merged, and an
/// unconstrained string alternative allows free text.
fn scalar_union(outer: &SchemaFragment, shapes: &[SchemaFragment]) -> SchemaFragment {
    let mut merged = outer.clone();
    merged.any_of.clear();
    merged.schema_type = merged
        .schema_type
        .or_else(|| shapes.iter().find_map(|s| s.schema_type));

    let mut values: Vec<Value> = Vec::new();
    for shape in shapes {
        let own = shape
            .enum_values
            .clone()
            .or_else(|| shape.const_value.clone().map(|c| vec![c]));
        match own {
            Some(list) => {
                for v in list {
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
            }
            None if shape.schema_type == Some(SchemaType::String) && shape.pattern.is_none() => {
                merged.free_text = true;
            }
            None => {}
        }
        if merged.pattern.is_none() {
            merged.pattern = shape.pattern.clone();
        }
    }
    if !values.is_empty() {
        merged.enum_values = Some(values);
    }
    merged
}

fn walk_properties(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if frame.key.is_some() || frame.target != Target::Node {
        return Ok(Flow::Continue);
    }
    let mut entries: Vec<(String, Value)> = frame
        .fragment
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let index_of = |v: &Value| v.get("propertyIndex").and_then(Value::as_i64);
    if entries.iter().any(|(_, v)| index_of(v).is_some()) {
        entries.sort_by_key(|(_, v)| index_of(v).unwrap_or(i64::MAX));
    }
    for (key, value) in entries {
        w.parse(
            tree,
            frame.node,
            value,
            Some(PathSegment::Key(key)),
            frame.depth + 1,
            0,
            false,
        )?;
    }

    let node = tree.node_mut(frame.node);
    for name in &frame.fragment.required {
        if let Some(property) = node.properties.get_mut(name) {
            property.required = true;
        }
    }
    Ok(Flow::Continue)
}

fn walk_items(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if frame.key.is_some() || frame.target != Target::Node {
        return Ok(Flow::Continue);
    }
    match frame.fragment.items.clone() {
        Some(Items::Tuple(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                w.parse(
                    tree,
                    frame.node,
                    item,
                    Some(PathSegment::Index(i)),
                    frame.depth + 1,
                    0,
                    false,
                )?;
            }
        }
        Some(Items::Shared(schema)) => {
            let node = tree.node_mut(frame.node);
            if !node
                .templates
                .iter()
                .any(|t| t.source == TemplateSource::Items && t.schema == schema)
            {
                node.templates.push(Template::items(schema));
            }
        }
        None => {}
    }
    Ok(Flow::Continue)
}

fn copy_descriptive(_: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    let node = tree.node_mut(frame.node);
    match &frame.target {
        Target::Node => node.descriptive.absorb(&frame.fragment, frame.ref_depth),
        Target::Property(name) => {
            if let Some(property) = node.properties.get_mut(name) {
                property.descriptive.absorb(&frame.fragment, frame.ref_depth);
            }
        }
    }
    Ok(Flow::Continue)
}

fn register_templates(_: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    if frame.key.is_some() || frame.target != Target::Node {
        return Ok(Flow::Continue);
    }
    let node = tree.node_mut(frame.node);
    if let Some(schema) = &frame.fragment.additional_properties
        && !node
            .templates
            .iter()
            .any(|t| t.source == TemplateSource::AdditionalProperties)
    {
        node.templates.push(Template::additional(schema.clone()));
    }
    for (pattern, schema) in &frame.fragment.pattern_properties {
        let source = TemplateSource::PatternProperties(pattern.clone());
        if node.templates.iter().any(|t| t.source == source) {
            continue;
        }
        match Template::pattern(pattern, schema.clone()) {
            Ok(template) => node.templates.push(template),
            Err(err) => warn!("{}: {err}; template skipped", frame.path),
        }
    }
    Ok(Flow::Continue)
}

fn finish(w: &SchemaWalker<'_>, tree: &mut Tree, frame: &mut Frame) -> Result<Flow> {
    let node = tree.node_mut(frame.node);
    match &frame.target {
        Target::Node => {
            if w
                .options
                .addable_table_paths
                .iter()
                .any(|p| node.path.ends_with_str(p))
            {
                node.addable = true;
            }
        }
        Target::Property(name) => {
            if let Some(property) = node.properties.get_mut(name) {
                property.free_text |= frame.fragment.free_text;
                if property.schema.enum_values.is_none() {
                    property.schema.enum_values = frame.fragment.enum_values.clone();
                }
            }
        }
    }
    Ok(Flow::Continue)
}
