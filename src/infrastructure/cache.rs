//! On-disk cache layout for acquired template sources.
//!
//! Git clones and restored packages land under a single per-user root so
//! repeated instantiations reuse them. The cache has no locking: two
//! processes sharing it concurrently can race on the same clone or restore,
//! so stencil is single-instance-only.

use std::path::{Path, PathBuf};

/// Root directory of the acquisition cache, with the fixed subtrees the
/// resolver expects.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The per-user default: `<platform cache dir>/stencil`.
    pub fn default_layout() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("stencil"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory git repositories are cloned under, one subdirectory per
    /// repository name.
    pub fn git_root(&self) -> PathBuf {
        self.root.join("git")
    }

    /// Expected directory for one restored package version.
    pub fn package_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join("packages").join(name).join(version)
    }
}

impl Default for CacheLayout {
    fn default() -> Self {
        Self::default_layout()
    }
}
