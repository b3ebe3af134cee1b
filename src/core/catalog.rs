//! Aggregation of every template discoverable across the configured sources.
//!
//! Each scan resolves every source and walks it for manifest files; a source
//! that fails to resolve or a manifest that fails to parse is recorded as a
//! diagnostic and skipped, never aborting the rest of the pass. There is no
//! cross-call caching; every invocation re-scans every source.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::core::manifest::{self, MANIFEST_NAME_PATTERNS};
use crate::core::resolver::SourceResolver;
use crate::core::selector;
use crate::core::source::TemplateSource;
use crate::core::template::Template;
use crate::infrastructure::cache::CacheLayout;
use crate::infrastructure::git::GitClient;
use crate::infrastructure::packages::PackageClient;

/// One skipped source or manifest, with the reason.
#[derive(Debug, Clone)]
pub struct CatalogDiagnostic {
    /// What was skipped: a source description or a manifest path.
    pub origin: String,
    pub message: String,
}

/// The outcome of one catalog pass.
#[derive(Debug, Default)]
pub struct CatalogScan {
    /// Templates in source order, then manifest discovery order.
    pub templates: Vec<Template>,
    /// Everything that was skipped on the way.
    pub diagnostics: Vec<CatalogDiagnostic>,
}

impl CatalogScan {
    /// Case-insensitive lookup by template name or alias.
    pub fn find(&self, requested: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|template| template.matches_name(requested))
    }
}

/// Scans configured sources for installed templates.
pub struct TemplateCatalog {
    resolver: SourceResolver,
}

impl TemplateCatalog {
    pub fn new(cache: CacheLayout) -> Self {
        Self {
            resolver: SourceResolver::new(cache),
        }
    }

    pub fn with_clients(
        cache: CacheLayout,
        git: Arc<dyn GitClient>,
        packages: Arc<dyn PackageClient>,
    ) -> Self {
        Self {
            resolver: SourceResolver::with_clients(cache, git, packages),
        }
    }

    /// One pass over `sources` in order, collecting every parseable template
    /// and a diagnostic for everything skipped.
    pub async fn installed_templates(&self, sources: &[TemplateSource]) -> CatalogScan {
        let mut scan = CatalogScan::default();
        let patterns: Vec<String> = MANIFEST_NAME_PATTERNS
            .iter()
            .map(|pattern| pattern.to_string())
            .collect();

        for source in sources {
            let root = match self.resolver.resolve(source, Path::new(".")).await {
                Ok(root) => root,
                Err(error) => {
                    warn!(source = %source, %error, "skipping unresolvable template source");
                    scan.diagnostics.push(CatalogDiagnostic {
                        origin: source.to_string(),
                        message: error.to_string(),
                    });
                    continue;
                }
            };

            let manifests = selector::select(&root, Some(patterns.as_slice()), &[]).await;
            for manifest_path in manifests {
                match manifest::load_template(&manifest_path).await {
                    Ok(template) => scan.templates.push(template),
                    Err(error) => {
                        warn!(
                            manifest = %manifest_path.display(),
                            %error,
                            "skipping unparseable manifest"
                        );
                        scan.diagnostics.push(CatalogDiagnostic {
                            origin: manifest_path.display().to_string(),
                            message: error.to_string(),
                        });
                    }
                }
            }
        }
        scan
    }
}
