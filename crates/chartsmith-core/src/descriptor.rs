//! Chart.yaml descriptor model and loading

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Descriptor file name, matched case-insensitively
pub const DESCRIPTOR_FILE: &str = "Chart.yaml";

/// Lock artifact written next to the descriptor by helm
pub const LOCK_FILE: &str = "Chart.lock";

/// Repository prefix marking a dependency as vendored on the local filesystem
pub const LOCAL_SCHEME: &str = "file://";

/// A Helm chart descriptor (Chart.yaml)
///
/// Only the fields the override pass needs are modelled; everything else in
/// the file is ignored here and preserved verbatim on rewrite.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescriptor {
    /// API version (v1 or v2)
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart version
    #[serde(deserialize_with = "scalar_serde::required")]
    pub version: String,

    /// Dependencies in file order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<DependencyEntry>,
}

/// A single entry of the `dependencies:` list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyEntry {
    /// Dependency name
    pub name: String,

    /// Repository URI, `file://` for vendored charts
    #[serde(default)]
    pub repository: Option<String>,

    /// Version constraint
    #[serde(default, deserialize_with = "scalar_serde::optional")]
    pub version: Option<String>,
}

impl DependencyEntry {
    /// Whether the repository points at the local filesystem
    #[inline]
    pub fn is_override_candidate(&self) -> bool {
        self.repository
            .as_deref()
            .is_some_and(|repo| repo.starts_with(LOCAL_SCHEME))
    }
}

impl ChartDescriptor {
    /// Parse descriptor content; `path` is only used for error reporting
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| CoreError::DescriptorParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Dependencies that should be redirected to a registry
    pub fn override_candidates(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.dependencies.iter().filter(|d| d.is_override_candidate())
    }

    /// Archive name `helm package` produces for this chart
    pub fn archive_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

/// A descriptor together with where it was read from
#[derive(Debug, Clone)]
pub struct LoadedChart {
    /// Parsed descriptor
    pub descriptor: ChartDescriptor,

    /// Chart root directory
    pub root: PathBuf,

    /// Actual descriptor path (its case may differ from `Chart.yaml`)
    pub descriptor_path: PathBuf,

    /// Raw descriptor content as read from disk
    pub content: String,
}

impl LoadedChart {
    /// Load the descriptor from a chart directory
    ///
    /// Returns `Ok(None)` when the directory has no descriptor. The file is
    /// always read from disk; nothing is cached between calls.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Option<Self>> {
        let root = dir.as_ref().to_path_buf();

        let Some(descriptor_path) = find_descriptor(&root)? else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(&descriptor_path)
            .map_err(|e| CoreError::io(&descriptor_path, e))?;
        let descriptor = ChartDescriptor::parse(&content, &descriptor_path)?;

        Ok(Some(Self {
            descriptor,
            root,
            descriptor_path,
            content,
        }))
    }

    /// Path of the sibling lock artifact, whether or not it exists
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }
}

/// Whether a file name is the chart descriptor, ignoring case
pub fn is_descriptor_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(DESCRIPTOR_FILE)
}

/// Locate the descriptor file directly inside `dir`
pub fn find_descriptor(dir: &Path) -> Result<Option<PathBuf>> {
    let exact = dir.join(DESCRIPTOR_FILE);
    if exact.is_file() {
        return Ok(Some(exact));
    }

    if !dir.is_dir() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        let matches = entry.file_name().to_str().is_some_and(is_descriptor_name);
        if matches && path.is_file() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<DependencyEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DependencyEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Textual form of a YAML scalar; `None` for null and collections
pub(crate) fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts a YAML scalar (string, number, bool) as its textual form
///
/// Chart authors frequently write `version: 1.0` unquoted.
mod scalar_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            other => super::scalar_text(&other).map(Some).ok_or_else(|| {
                D::Error::custom(format!("expected a scalar version, found {:?}", other))
            }),
        }
    }

    pub fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        optional(deserializer)?.ok_or_else(|| D::Error::custom("version must not be null"))
    }
}
