//! # pagemodel
//!
//! Schema-driven page model for visual page editors.
//!
//! A page is described by a JSON Schema (with extension keywords), its
//! current configuration data and a bundle of annotation descriptors.
//! `pagemodel` turns these into an ordered tree of typed nodes that knows
//! which actions each node supports, where a node may be dragged, and
//! whether each value is sanctioned by the schema alternative it matched.
//!
//! ## Features
//!
//! - `$ref` (`definitions` and `$defs`), `anyOf`, `properties`, `items`,
//!   `additionalProperties` and `patternProperties` traversal
//! - Sections, tables, columns, actions, fields, filter fields, views, charts
//!   and building blocks as distinct node kinds
//! - Tri-state validation of `anyOf` variants against live values
//! - Drag-and-drop legality and custom vs. generated node classification
//!
//! ## Quick Start
//!
//! ```rust
//! use pagemodel::{AnnotationBundle, ModelOptions, PageEditModel};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "sections": {
//!             "type": "object",
//!             "additionalProperties": { "$ref": "#/definitions/Section" }
//!         }
//!     },
//!     "definitions": {
//!         "Section": {
//!             "type": "object",
//!             "properties": { "title": { "type": "string" } }
//!         }
//!     }
//! });
//! let data = json!({ "sections": { "Notes": { "title": "Notes" } } });
//!
//! let model = PageEditModel::new(
//!     schema,
//!     data.clone(),
//!     AnnotationBundle::default(),
//!     ModelOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(model.to_value(), data);
//! ```
//!
//! ## Modules
//!
//! - [`annotation`] - Annotation descriptors and lookups
//! - [`config`] - Model options
//! - [`error`] - Error types
//! - [`factory`] - Node kind selection
//! - [`i18n`] - Text bundles and key formatting
//! - [`kinds`] - Node kinds and their behavior table
//! - [`model`] - The page edit model
//! - [`schema`] - Schema documents and fragments
//! - [`tree`] - The node arena
//! - [`validator`] - Variant validation
//! - [`walker`] - Schema traversal

#[macro_use]
extern crate log;

/// Annotation descriptors and lookups.
pub mod annotation;

/// Model construction options.
///
/// Options can be loaded from JSON or TOML files and come with a JSON
/// Schema of their own.
pub mod config;

/// Error types.
pub mod error;

/// Node kind selection.
pub mod factory;

/// Text bundles and key formatting.
pub mod i18n;

/// Node kinds and their behavior table.
pub mod kinds;

/// The page edit model.
///
/// Entry point of the crate: builds the tree, assigns values and keeps
/// node states current as data changes.
pub mod model;

/// Schema documents and fragments.
pub mod schema;

/// The node arena.
pub mod tree;

/// Variant validation.
pub mod validator;

/// Schema traversal.
pub mod walker;

pub use annotation::{AnnotationBundle, AnnotationNode, SourceLocation};
pub use config::{ModelOptions, PageGeneration};
pub use error::{ModelError, Result};
pub use i18n::I18nBundle;
pub use kinds::NodeKind;
pub use model::PageEditModel;
pub use tree::{ActionKind, NodeId, NodePath, SortMode, Tree, ValidationState};
pub use serde_json::Value;
