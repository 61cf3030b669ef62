//! Resolved text bundle lookups and key formatting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A resolved `key -> text` bundle.
///
/// The bundle is consumed read-only; texts referring to it use the binding
/// syntax `{i18n>KEY}` or `{@i18n>KEY}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct I18nBundle {
    entries: HashMap<String, String>,
}

impl I18nBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a text.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    /// Look a key up.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Resolve a text that may be an i18n binding.
    ///
    /// A binding that misses the bundle falls back to the bare key; plain
    /// text is returned unchanged.
    pub fn resolve_text(&self, text: &str) -> String {
        match binding_key(text) {
            Some(key) => self
                .get(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.to_string()),
            None => text.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for I18nBundle {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn binding_key(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    inner
        .strip_prefix("@i18n>")
        .or_else(|| inner.strip_prefix("i18n>"))
        .map(str::trim)
}

/// Turn a technical key into a human readable label.
///
/// `relatedFacet` becomes `Related Facet`, `line_items` becomes
/// `Line Items`, and annotation qualifiers after `::` or `#` are kept as
/// separate words.
pub fn format_key(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in key.chars() {
        if matches!(ch, '_' | '-' | ' ' | ':' | '#' | '.' | '@' | '/') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
