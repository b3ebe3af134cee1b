//! Git collaborator for acquiring remote template sources.
//!
//! The resolver only ever asks for a clone into the cache; there is no
//! implicit pull, and a clone that leaves no directory behind surfaces as a
//! resolution failure rather than an error here.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::warn;
use url::Url;

use crate::core::error::{Error, Result};

/// Trait for acquiring git repositories into a local directory
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone `url` at `branch` into `workdir/dir_name`.
    async fn clone_repo(&self, url: &Url, branch: &str, workdir: &Path, dir_name: &str)
    -> Result<()>;
}

/// Default git client shelling out to the `git` binary
pub struct ShellGitClient;

impl ShellGitClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellGitClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitClient for ShellGitClient {
    async fn clone_repo(
        &self,
        url: &Url,
        branch: &str,
        workdir: &Path,
        dir_name: &str,
    ) -> Result<()> {
        fs::create_dir_all(workdir).await?;

        let output = Command::new("git")
            .arg("clone")
            .arg(url.as_str())
            .arg("--branch")
            .arg(branch)
            .arg("--single-branch")
            .arg(dir_name)
            .current_dir(workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::invalid_operation(format!("failed to run git clone for [{url}]: {e}"))
            })?;

        // The caller judges success by whether the expected directory exists
        // afterward, so a nonzero exit is only worth a warning here.
        if !output.status.success() {
            warn!(
                %url,
                branch,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "git clone exited nonzero"
            );
        }
        Ok(())
    }
}

/// Mock git client for testing
#[cfg(test)]
pub struct MockGitClient {
    /// Create the expected clone directory, simulating a successful clone.
    pub create_clone_dir: bool,
    /// `url#branch` of every clone request received.
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockGitClient {
    pub fn new(create_clone_dir: bool) -> Self {
        Self {
            create_clone_dir,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl GitClient for MockGitClient {
    async fn clone_repo(
        &self,
        url: &Url,
        branch: &str,
        workdir: &Path,
        dir_name: &str,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{url}#{branch}"));
        if self.create_clone_dir {
            fs::create_dir_all(workdir.join(dir_name)).await?;
        }
        Ok(())
    }
}
