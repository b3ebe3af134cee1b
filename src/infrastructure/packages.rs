//! Package collaborator for acquiring template sources from a registry.
//!
//! Restore downloads the package archive over HTTP and unpacks it into the
//! versioned cache directory with a shell `tar` invocation. As with git, the
//! resolver judges success by the cache directory existing afterward.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::core::error::{Error, Result};

/// Registry the default client downloads from.
pub const DEFAULT_REGISTRY_URL: &str = "https://crates.io/api/v1/crates";

/// Trait for restoring a named package version into a local directory
#[async_trait]
pub trait PackageClient: Send + Sync {
    async fn restore(&self, name: &str, version: &str, dest_dir: &Path) -> Result<()>;
}

/// Default package client downloading `<registry>/<name>/<version>/download`
pub struct HttpPackageClient {
    client: reqwest::Client,
    registry_url: String,
}

impl HttpPackageClient {
    pub fn new() -> Self {
        Self::with_registry(DEFAULT_REGISTRY_URL)
    }

    pub fn with_registry(registry_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            registry_url: registry_url.into(),
        }
    }
}

impl Default for HttpPackageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageClient for HttpPackageClient {
    async fn restore(&self, name: &str, version: &str, dest_dir: &Path) -> Result<()> {
        let url = format!("{}/{name}/{version}/download", self.registry_url);
        debug!(%url, "downloading template package");

        let response = self.client.get(&url).send().await.map_err(|e| {
            Error::invalid_operation(format!(
                "failed to download package [{name}@{version}]: {e}"
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::invalid_operation(format!(
                "HTTP {status} when downloading package [{name}@{version}]"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            Error::invalid_operation(format!(
                "failed to read package download [{name}@{version}]: {e}"
            ))
        })?;

        let scratch = tempfile::tempdir()?;
        let archive = scratch.path().join(format!("{name}-{version}.crate"));
        fs::write(&archive, &bytes).await?;
        fs::create_dir_all(dest_dir).await?;

        // Registry archives are gzipped tarballs with a single
        // `<name>-<version>/` top-level directory.
        let output = Command::new("tar")
            .arg("xzf")
            .arg(&archive)
            .arg("-C")
            .arg(dest_dir)
            .arg("--strip-components=1")
            .output()
            .await
            .map_err(|e| {
                Error::invalid_operation(format!("failed to run tar for [{name}@{version}]: {e}"))
            })?;

        if !output.status.success() {
            return Err(Error::invalid_operation(format!(
                "failed to unpack package [{name}@{version}]: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

/// Mock package client for testing
#[cfg(test)]
pub struct MockPackageClient {
    /// Create the destination directory, simulating a successful restore.
    pub create_dest_dir: bool,
    /// `name@version` of every restore request received.
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockPackageClient {
    pub fn new(create_dest_dir: bool) -> Self {
        Self {
            create_dest_dir,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl PackageClient for MockPackageClient {
    async fn restore(&self, name: &str, version: &str, dest_dir: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{name}@{version}"));
        if self.create_dest_dir {
            fs::create_dir_all(dest_dir).await?;
        }
        Ok(())
    }
}
