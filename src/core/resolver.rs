//! Resolution of a template source descriptor to a local directory.
//!
//! Folder sources resolve in place; git and package sources delegate
//! acquisition to their collaborators, keyed by a cache directory, and only
//! acquire on a cache miss (no implicit refresh). Resolution returns the
//! directory as a value scoped to the one call (it never writes back into
//! the shared descriptor) and it never partially succeeds: the caller gets
//! an existing directory or a typed error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::info;
use url::Url;

use crate::core::error::{Error, Result};
use crate::core::source::{SourceLocation, TemplateSource};
use crate::infrastructure::cache::CacheLayout;
use crate::infrastructure::git::{GitClient, ShellGitClient};
use crate::infrastructure::packages::{HttpPackageClient, PackageClient};

/// Maps a source descriptor to an existing local directory.
pub struct SourceResolver {
    cache: CacheLayout,
    git: Arc<dyn GitClient>,
    packages: Arc<dyn PackageClient>,
}

impl SourceResolver {
    /// Resolver with the default shell git and HTTP package collaborators.
    pub fn new(cache: CacheLayout) -> Self {
        Self::with_clients(
            cache,
            Arc::new(ShellGitClient::new()),
            Arc::new(HttpPackageClient::new()),
        )
    }

    pub fn with_clients(
        cache: CacheLayout,
        git: Arc<dyn GitClient>,
        packages: Arc<dyn PackageClient>,
    ) -> Self {
        Self {
            cache,
            git,
            packages,
        }
    }

    /// Resolve `source` to an existing local directory. Relative folder
    /// paths resolve against `base_dir`, normally the directory of the
    /// manifest that declared the source.
    pub async fn resolve(&self, source: &TemplateSource, base_dir: &Path) -> Result<PathBuf> {
        let base = match &source.location {
            SourceLocation::Folder { path } => {
                if path.is_absolute() {
                    path.clone()
                } else {
                    base_dir.join(path)
                }
            }
            SourceLocation::Git { url, branch } => {
                let repo = repo_name(url)?;
                let expected = self.cache.git_root().join(&repo);
                if !expected.exists() {
                    info!(%url, %branch, "cloning template repository");
                    self.git
                        .clone_repo(url, branch, &self.cache.git_root(), &repo)
                        .await?;
                }
                if !expected.exists() {
                    return Err(Error::invalid_operation(format!(
                        "unable to get template from git [url={url}, branch={branch}]"
                    )));
                }
                expected
            }
            SourceLocation::Package { name, version } => {
                let expected = self.cache.package_dir(name, version);
                if !expected.exists() {
                    info!(%name, %version, "restoring template package");
                    self.packages.restore(name, version, &expected).await?;
                }
                if !expected.exists() {
                    return Err(Error::invalid_operation(format!(
                        "package not found at [{}]",
                        expected.display()
                    )));
                }
                expected
            }
        };

        let resolved = match &source.source_rel_path {
            Some(rel) => base.join(rel),
            None => base,
        };

        if !resolved.is_dir() {
            return Err(Error::not_found(format!(
                "template directory not found at [{}]",
                resolved.display()
            )));
        }
        Ok(fs::canonicalize(&resolved).await?)
    }
}

/// Cache directory name for a repository: the last non-empty URL path
/// segment with a `.git` suffix stripped.
fn repo_name(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.rev().find(|segment| !segment.is_empty()))
        .map(|segment| segment.trim_end_matches(".git").to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            Error::invalid_operation(format!("unable to get repo name from url [{url}]"))
        })
}
