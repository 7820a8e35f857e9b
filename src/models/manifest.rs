use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// The app's `package.json`.
///
/// Only the fields the task runner reads are modelled. Platform packages are
/// declared as ordinary npm dependencies, so npm handles downloading them and
/// their version preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    /// Dependency package name to version constraint. `None` when the manifest
    /// has no usable `dependencies` object.
    #[serde(default, deserialize_with = "lenient_dependencies")]
    pub dependencies: Option<BTreeMap<String, String>>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Whether `package` is listed as a dependency.
    pub fn depends_on(&self, package: &str) -> bool {
        self.dependencies
            .as_ref()
            .is_some_and(|deps| deps.contains_key(package))
    }
}

/// Accepts any JSON for `dependencies`; anything other than an object is
/// treated as absent. Non-string constraints are kept in their JSON form.
fn lenient_dependencies<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Object(map) = value else {
        return Ok(None);
    };

    Ok(Some(
        map.into_iter()
            .map(|(name, constraint)| {
                let constraint = match constraint {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, constraint)
            })
            .collect(),
    ))
}
