//! Variant validation.
//!
//! A node built from an `anyOf` carries one [`Variant`] per alternative.
//! [`AggregationValidator`] decides which variants the live values still
//! fit and classifies each property and child as Valid, Invalid or Skipped.
//!
//! The validator never mutates the tree. It describes its decisions as
//! [`ValidationPatch`]es which the caller applies.

use std::{cell::RefCell, collections::HashMap};

use regex::Regex;

use crate::tree::{NodeId, NodePath, Tree, ValidationState, Variant};

/// One decision of the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationPatch {
    /// Set the state of a leaf property.
    PropertyState {
        node: NodeId,
        property: String,
        state: ValidationState,
    },
    /// Set the state of a node.
    NodeState { node: NodeId, state: ValidationState },
    /// Point a union child at the data key it is actually read from and
    /// narrow its variants to those of the matched alternatives.
    RedirectUnion {
        node: NodeId,
        path: NodePath,
        variants: Vec<Variant>,
        reason: String,
    },
}

impl ValidationPatch {
    /// Apply the patch to `tree`.
    pub fn apply(&self, tree: &mut Tree) {
        match self {
            ValidationPatch::PropertyState {
                node,
                property,
                state,
            } => {
                if let Some(p) = tree.node_mut(*node).properties.get_mut(property) {
                    p.state = *state;
                }
            }
            ValidationPatch::NodeState { node, state } => {
                tree.node_mut(*node).state = *state;
            }
            ValidationPatch::RedirectUnion {
                node,
                path,
                variants,
                reason,
            } => {
                debug!("{}: {reason}", tree.node(*node).path);
                tree.set_path(*node, path.clone());
                tree.node_mut(*node).variants = variants.clone();
            }
        }
    }
}

/// Computes per-key validation states from variants and live values.
#[derive(Debug, Default)]
pub struct AggregationValidator {
    patterns: RefCell<HashMap<String, Option<Regex>>>,
}

impl AggregationValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the subtree at `id`, applying patches on the way down.
    pub fn validate_subtree(&self, tree: &mut Tree, id: NodeId) {
        for patch in self.validate(tree, id) {
            patch.apply(tree);
        }
        for child in tree.children(id) {
            self.validate_subtree(tree, child);
        }
    }

    /// Decisions for the direct members of `id`.
    ///
    /// Only Valid nodes declaring variants are examined.
    pub fn validate(&self, tree: &Tree, id: NodeId) -> Vec<ValidationPatch> {
        let node = tree.node(id);
        if node.state != ValidationState::Valid || node.variants.is_empty() {
            return Vec::new();
        }
        self.validate_variants(&node.variants, tree, id)
    }

    /// Match `variants` against the values of `id` and classify its members.
    pub fn validate_variants(
        &self,
        variants: &[Variant],
        tree: &Tree,
        id: NodeId,
    ) -> Vec<ValidationPatch> {
        let node = tree.node(id);
        let set_keys: Vec<&str> = node
            .properties
            .iter()
            .filter(|(_, p)| p.has_value())
            .map(|(k, _)| k.as_str())
            .chain(
                node.children
                    .iter()
                    .filter(|(_, c)| tree.node(**c).has_value())
                    .map(|(k, _)| k.as_str()),
            )
            .collect();

        let fits = |v: &Variant, ignore: bool| {
            set_keys
                .iter()
                .all(|k| self.validate_variant(v, tree, id, k, ignore) == ValidationState::Valid)
        };
        let mut ignore = false;
        let mut matched: Vec<&Variant> = variants.iter().filter(|v| fits(v, false)).collect();
        if matched.is_empty() {
            ignore = true;
            matched = variants.iter().filter(|v| fits(v, true)).collect();
        }
        trace!(
            "{}: matched variants {:?}",
            node.path,
            matched.iter().map(|v| v.name.as_str()).collect::<Vec<_>>()
        );

        let mut patches = self.union_redirects(&matched, tree, id);
        let classify = |key: &str, has_value: bool| {
            if matched
                .iter()
                .any(|v| self.validate_variant(v, tree, id, key, ignore) == ValidationState::Valid)
            {
                ValidationState::Valid
            } else if has_value {
                ValidationState::Invalid
            } else {
                ValidationState::Skipped
            }
        };

        for (name, property) in &node.properties {
            patches.push(ValidationPatch::PropertyState {
                node: id,
                property: name.clone(),
                state: classify(name, property.has_value()),
            });
        }
        for (key, &child) in &node.children {
            let child_node = tree.node(child);
            let state = if child_node.inactive {
                ValidationState::Invalid
            } else {
                classify(key, child_node.has_value())
            };
            patches.push(ValidationPatch::NodeState { node: child, state });
        }
        patches
    }

    /// State of `key` under one variant.
    ///
    /// An undeclared key is Skipped, or Valid when `ignore_unexisting` is
    /// set. A declared property is Invalid when its value breaks the
    /// variant's `pattern` or `enum`; free-text properties skip the enum.
    pub fn validate_variant(
        &self,
        variant: &Variant,
        tree: &Tree,
        id: NodeId,
        key: &str,
        ignore_unexisting: bool,
    ) -> ValidationState {
        if let Some(fragment) = variant.properties.get(key) {
            let property = tree.node(id).properties.get(key);
            let Some(value) = property.and_then(|p| p.value.as_ref()) else {
                return ValidationState::Valid;
            };
            if let (Some(pattern), Some(text)) = (&fragment.pattern, value.as_str())
                && !self.matches(pattern, text)
            {
                return ValidationState::Invalid;
            }
            let free_text = fragment.free_text || property.is_some_and(|p| p.free_text);
            if let Some(allowed) = &fragment.enum_values
                && !free_text
                && !allowed.contains(value)
            {
                return ValidationState::Invalid;
            }
            ValidationState::Valid
        } else if variant.children.contains_key(key) || ignore_unexisting {
            ValidationState::Valid
        } else {
            ValidationState::Skipped
        }
    }

    fn union_redirects(
        &self,
        matched: &[&Variant],
        tree: &Tree,
        id: NodeId,
    ) -> Vec<ValidationPatch> {
        let node = tree.node(id);
        let present = |source: &str| {
            node.value
                .as_ref()
                .and_then(|v| v.get(source))
                .is_some_and(|v| !v.is_null())
        };
        let mut patches = Vec::new();
        for (key, &child) in &node.children {
            let members: Vec<(&Variant, &str)> = matched
                .iter()
                .filter_map(|v| {
                    let source = v.children.get(key)?.union_source.as_deref()?;
                    Some((*v, source))
                })
                .collect();
            let Some(&(_, first)) = members.first() else {
                continue;
            };
            let source = members
                .iter()
                .map(|(_, s)| *s)
                .find(|s| present(*s))
                .unwrap_or(first);
            let variants = members
                .iter()
                .filter_map(|(v, _)| {
                    let mut shape = v.children.get(key)?.shape.clone();
                    shape.name = v.name.clone();
                    Some(shape)
                })
                .collect();
            patches.push(ValidationPatch::RedirectUnion {
                node: child,
                path: node.path.child(source),
                variants,
                reason: format!("union `{key}` reads `{source}`"),
            });
        }
        patches
    }

    fn matches(&self, pattern: &str, text: &str) -> bool {
        let mut cache = self.patterns.borrow_mut();
        let regex = cache.entry(pattern.to_string()).or_insert_with(|| {
            Regex::new(pattern)
                .inspect_err(|err| warn!("invalid pattern `{pattern}`: {err}"))
                .ok()
        });
        regex.as_ref().is_none_or(|re| re.is_match(text))
    }
}
