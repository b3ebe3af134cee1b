//! Manifest parsing for templates stored on disk.
//!
//! One manifest file describes one template. The raw YAML shape is
//! deserialized into an internal [`ManifestData`] and converted into the
//! domain model, so serde details stay out of [`Template`] itself.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::core::error::{Error, Result};
use crate::core::source::TemplateSource;
use crate::core::template::{Replacement, Template, TemplateKind};

/// Fixed name patterns the catalog scans for, evaluated per directory.
pub const MANIFEST_NAME_PATTERNS: &[&str] = &["stencil*.yml", "stencil*.yaml"];

fn default_true() -> bool {
    true
}

/// Internal representation matching the manifest YAML structure
#[derive(Debug, Deserialize)]
pub(crate) struct ManifestData {
    /// The name of the template
    name: String,
    #[serde(default)]
    kind: TemplateKind,
    /// Nest the output under a new project folder (default true)
    #[serde(default = "default_true")]
    create_new_folder: bool,
    #[serde(default)]
    aliases: BTreeSet<String>,
    /// Content substitution rules, order is significant
    #[serde(default)]
    replacements: Vec<ReplacementData>,
    /// File/directory rename rules, order is significant
    #[serde(default)]
    path_replacements: Vec<ReplacementData>,
    /// Glob patterns for files that do not belong to the template
    #[serde(default)]
    excludes: Vec<String>,
    /// Where the files live; omitted means "this manifest's directory"
    #[serde(default)]
    source: Option<TemplateSource>,
}

#[derive(Debug, Deserialize)]
struct ReplacementData {
    key: String,
    value: String,
    #[serde(default)]
    default: Option<String>,
}

impl ReplacementData {
    fn into_replacement(self, manifest_path: &Path) -> Result<Replacement> {
        if self.key.trim().is_empty() {
            return Err(Error::invalid_manifest(format!(
                "replacement with an empty key in [{}]",
                manifest_path.display()
            )));
        }
        Ok(Replacement {
            key: self.key,
            value: self.value,
            default_value: self.default,
        })
    }
}

impl ManifestData {
    /// Convert the raw manifest data into the domain model
    fn into_template(self, manifest_path: &Path) -> Result<Template> {
        let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));

        // A manifest without a source describes files sitting next to it.
        let source = self
            .source
            .unwrap_or_else(|| TemplateSource::folder(manifest_dir));

        let replacements = self
            .replacements
            .into_iter()
            .map(|data| data.into_replacement(manifest_path))
            .collect::<Result<Vec<_>>>()?;
        let path_replacements = self
            .path_replacements
            .into_iter()
            .map(|data| data.into_replacement(manifest_path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Template {
            name: self.name,
            kind: self.kind,
            create_new_folder: self.create_new_folder,
            aliases: self.aliases,
            replacements,
            path_replacements,
            excludes: self.excludes,
            source,
            manifest_path: manifest_path.to_path_buf(),
        })
    }
}

/// Parse manifest YAML content into a [`Template`].
pub fn parse_manifest(content: &str, manifest_path: &Path) -> Result<Template> {
    let data: ManifestData = serde_yaml::from_str(content).map_err(|e| {
        Error::invalid_manifest(format!(
            "failed to parse [{}]: {e}",
            manifest_path.display()
        ))
    })?;
    data.into_template(manifest_path)
}

/// Load a template from its manifest file.
pub async fn load_template(path: &Path) -> Result<Template> {
    if !path.exists() {
        return Err(Error::not_found(format!(
            "template manifest not found at [{}]",
            path.display()
        )));
    }
    let content = fs::read_to_string(path).await?;
    parse_manifest(&content, path)
}
