//! Template source descriptors.
//!
//! A source records where a template's files physically live: a folder on
//! disk, a git repository, or a registry package. Descriptors are value data;
//! resolving one to a local directory is the resolver's job and never writes
//! back into the descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

fn default_branch() -> String {
    "main".to_string()
}

/// Where the template files live, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceLocation {
    /// A directory, absolute or relative to the defining manifest.
    Folder { path: PathBuf },
    /// A git repository cloned into the local cache on first use.
    Git {
        url: Url,
        #[serde(default = "default_branch")]
        branch: String,
    },
    /// A registry package restored into the local cache on first use.
    Package { name: String, version: String },
}

/// Descriptor of a template's physical location.
///
/// Structural equality and hashing cover the location only; `source_files`
/// and `source_rel_path` are ignored so that the persisted source list
/// de-duplicates on where the files come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSource {
    #[serde(flatten)]
    pub location: SourceLocation,

    /// Explicit allow-list of files. Parsed and persisted, but combining it
    /// with exclude-based discovery is an unsupported path that fails loudly
    /// at instantiation time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<String>,

    /// Optional subdirectory under the resolved root holding the actual
    /// sources, mostly used for git repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_rel_path: Option<PathBuf>,
}

impl TemplateSource {
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            location: SourceLocation::Folder { path: path.into() },
            source_files: Vec::new(),
            source_rel_path: None,
        }
    }

    pub fn git(url: Url, branch: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::Git {
                url,
                branch: branch.into(),
            },
            source_files: Vec::new(),
            source_rel_path: None,
        }
    }

    pub fn package(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            location: SourceLocation::Package {
                name: name.into(),
                version: version.into(),
            },
            source_files: Vec::new(),
            source_rel_path: None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.location {
            SourceLocation::Folder { .. } => "folder",
            SourceLocation::Git { .. } => "git",
            SourceLocation::Package { .. } => "package",
        }
    }
}

impl PartialEq for TemplateSource {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for TemplateSource {}

impl Hash for TemplateSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            SourceLocation::Folder { path } => write!(f, "folder [{}]", path.display()),
            SourceLocation::Git { url, branch } => write!(f, "git [{url}#{branch}]"),
            SourceLocation::Package { name, version } => {
                write!(f, "package [{name}@{version}]")
            }
        }
    }
}
