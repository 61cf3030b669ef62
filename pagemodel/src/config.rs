//! Model construction options.
//!
//! Options are usually left at their defaults. Hosts that keep them in a
//! file can load them with [`ModelOptions::from_file`]:
//!
//! ```toml
//! generation = "V2"
//! suppressed_view_id = "tab2"
//! max_depth = 48
//! addable_table_paths = ["table/columns", "table/actions"]
//! ```

use std::{fs, path::Path};

use anyhow::{Context, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Page generation. Decides how section ids are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PageGeneration {
    /// Section ids come from the section description.
    V2,
    /// Section ids come from the section title.
    #[default]
    V4,
}

/// Options for building a [`crate::PageEditModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelOptions {
    /// Page generation of the edited application.
    pub generation: PageGeneration,
    /// View whose deletion is always disabled.
    pub suppressed_view_id: Option<String>,
    /// Maximum schema traversal depth, counting `$ref` hops.
    pub max_depth: usize,
    /// Path suffixes of collections that accept new members.
    pub addable_table_paths: Vec<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            generation: PageGeneration::default(),
            suppressed_view_id: None,
            max_depth: 64,
            addable_table_paths: [
                "table/columns",
                "table/actions",
                "header/actions",
                "footer/actions",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ModelOptions {
    /// Load options from a `.json` or `.toml` file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, does not parse, or has another
    /// extension.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read options from {}", path.display()))?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let options = match ext {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => bail!("Unsupported options file extension: {ext:?}"),
        };
        Ok(options)
    }

    /// JSON Schema of the options file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ModelOptions)).unwrap_or_default()
    }
}

/// Read a JSON or TOML document into a JSON value.
///
/// # Errors
///
/// Fails when the file cannot be read, does not parse, or has another
/// extension.
pub fn load_document(path: impl AsRef<Path>) -> anyhow::Result<serde_json::Value> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let value = match ext {
        "json" => serde_json::from_str(&content)?,
        "toml" => {
            let v: toml::Value = toml::from_str(&content)?;
            serde_json::to_value(v)?
        }
        _ => bail!("Unsupported file extension: {ext:?}"),
    };
    Ok(value)
}
