//! Node paths shared by schema space and data space.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One step of a [`NodePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object member.
    Key(String),
    /// Array position.
    Index(usize),
}

impl PathSegment {
    /// Look the segment up in a data value.
    pub fn lookup<'v>(&self, data: &'v Value) -> Option<&'v Value> {
        match self {
            PathSegment::Key(k) => data.get(k.as_str()),
            PathSegment::Index(i) => data.get(*i),
        }
    }

    /// The key, if this is an object member.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(k) => Some(k),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// Ordered list of segments locating a node from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// All segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Option<NodePath> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Whether the trailing segments spell `suffix`.
    pub fn ends_with(&self, suffix: &[&str]) -> bool {
        if suffix.len() > self.0.len() {
            return false;
        }
        self.0[self.0.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(seg, want)| seg.to_string() == *want)
    }

    /// Whether the `/`-separated `suffix` matches the trailing segments.
    pub fn ends_with_str(&self, suffix: &str) -> bool {
        let parts: Vec<&str> = suffix.split('/').filter(|s| !s.is_empty()).collect();
        !parts.is_empty() && self.ends_with(&parts)
    }

    /// Resolve the path against a data value.
    pub fn lookup<'v>(&self, data: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(data, |current, seg| seg.lookup(current))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for NodePath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
