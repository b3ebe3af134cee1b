//! Persistence for the configured template source list.
//!
//! The list is an ordered JSON array on disk, rewritten whole on every
//! mutation, never appended. Adding puts the new source first and drops
//! structural duplicates of it; removal reports whether anything matched.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::core::error::Result;
use crate::core::source::TemplateSource;

/// The on-disk source list.
pub struct SourceRegistry {
    path: PathBuf,
}

impl SourceRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user default: `<platform config dir>/stencil/sources.json`.
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        base.join("stencil").join("sources.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configured sources in persisted order. A missing file is an
    /// empty list, not an error.
    pub async fn load(&self) -> Result<Vec<TemplateSource>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Rewrite the whole list.
    pub async fn save(&self, sources: &[TemplateSource]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(sources)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Add a source at the front of the list, dropping structural duplicates
    /// of it further down. An unreadable existing file is reported and
    /// overwritten with the new source only.
    pub async fn add(&self, source: TemplateSource) -> Result<()> {
        let existing = match self.load().await {
            Ok(sources) => sources,
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "unreadable source list, rewriting with the new source only"
                );
                Vec::new()
            }
        };

        let mut sources = Vec::with_capacity(existing.len() + 1);
        sources.push(source);
        for existing_source in existing {
            if existing_source == sources[0] {
                continue;
            }
            sources.push(existing_source);
        }
        self.save(&sources).await
    }

    /// Remove the matching source. Returns whether anything was removed; the
    /// file is only rewritten when it was.
    pub async fn remove(&self, source: &TemplateSource) -> Result<bool> {
        let mut sources = self.load().await?;
        let before = sources.len();
        sources.retain(|existing| existing != source);
        if sources.len() == before {
            return Ok(false);
        }
        self.save(&sources).await?;
        Ok(true)
    }
}
