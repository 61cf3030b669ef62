//! Error types for page model construction.
//!
//! Most irregularities in upstream schemas, data and annotations are not
//! errors: they are logged and the offending piece is skipped, or they end up
//! as a node state. [`ModelError`] covers the remaining structural failures.

use crate::tree::NodeId;

/// Errors raised while building or mutating a page model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A value does not have the JSON type the caller expected.
    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Schema traversal went deeper than the configured limit, usually
    /// because of a cyclic `$ref` chain.
    #[error("schema recursion exceeded {limit} levels at `{path}`")]
    RecursionLimit { path: String, limit: usize },

    /// The node id does not belong to this tree.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node already has a parent.
    #[error("node `{path}` is already attached to a parent")]
    AlreadyAttached { path: String },

    /// The parent already has a child under this key.
    #[error("`{parent}` already has a child `{key}`")]
    DuplicateChild { parent: String, key: String },

    /// The operation needs a collection node.
    #[error("node `{path}` is not a collection")]
    NotACollection { path: String },

    /// A schema `pattern` or `patternProperties` key is not a valid regex.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ModelError>;
