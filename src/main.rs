//! stencil CLI entrypoint
//! Parses command-line arguments and dispatches to the template core.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use std::collections::HashMap;
use std::path::PathBuf;

use stencil::{
    CacheLayout, CatalogScan, ProjectCreator, SourceRegistry, TemplateCatalog, TemplateSource,
};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the configured sources file
    #[arg(long, global = true, value_name = "FILE")]
    sources: Option<PathBuf>,

    /// Override the acquisition cache directory
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List the templates installed across all configured sources
    List,
    /// List the configured template sources
    Sources,
    /// Add a template source
    Add {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Remove a previously added template source
    Remove {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Create a new project from an installed template
    New {
        /// Name or alias of the template to instantiate
        #[arg(long)]
        template: String,
        /// Directory the project is created under
        #[arg(long)]
        dest: PathBuf,
        /// Project name substituted into the template
        #[arg(long)]
        name: String,
        /// Extra substitution properties
        #[arg(short = 'p', long = "property", value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceKindArgs {
    /// Path to a folder containing template manifests
    #[arg(short = 'f', long)]
    folder: Option<PathBuf>,

    /// URL of a git repository containing templates
    #[arg(short = 'g', long)]
    git_url: Option<Url>,

    /// Name of a registry package containing templates
    #[arg(long)]
    package: Option<String>,
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    #[command(flatten)]
    kind: SourceKindArgs,

    /// Branch cloned from the git repository
    #[arg(short = 'b', long, default_value = "main")]
    git_branch: String,

    /// Version of the registry package
    #[arg(long, value_name = "VERSION")]
    package_version: Option<String>,
}

impl SourceArgs {
    fn into_source(self) -> anyhow::Result<TemplateSource> {
        if let Some(folder) = self.kind.folder {
            return Ok(TemplateSource::folder(folder));
        }
        if let Some(url) = self.kind.git_url {
            return Ok(TemplateSource::git(url, self.git_branch));
        }
        if let Some(name) = self.kind.package {
            let version = self
                .package_version
                .context("--package-version is required with --package")?;
            return Ok(TemplateSource::package(name, version));
        }
        anyhow::bail!("one of --folder, --git-url or --package is required");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = SourceRegistry::new(
        cli.sources
            .clone()
            .unwrap_or_else(SourceRegistry::default_path),
    );
    let cache = cli
        .cache_dir
        .clone()
        .map(CacheLayout::new)
        .unwrap_or_else(CacheLayout::default_layout);

    match cli.command {
        Commands::List => run_list(&registry, cache).await?,
        Commands::Sources => run_sources(&registry).await?,
        Commands::Add { source } => run_add(&registry, source).await?,
        Commands::Remove { source } => run_remove(&registry, source).await?,
        Commands::New {
            template,
            dest,
            name,
            properties,
        } => run_new(&registry, cache, &template, &dest, &name, &properties).await?,
    }
    Ok(())
}

/// List installed templates across every configured source
async fn run_list(registry: &SourceRegistry, cache: CacheLayout) -> anyhow::Result<()> {
    let scan = scan_catalog(registry, cache).await?;
    if scan.templates.is_empty() {
        println!("No templates installed");
        return Ok(());
    }

    let width = scan
        .templates
        .iter()
        .map(|template| template.name.len())
        .max()
        .unwrap_or(0);
    for template in &scan.templates {
        println!(
            "  - {:width$} [{}]",
            template.name,
            template.source.kind_name(),
            width = width
        );
    }
    Ok(())
}

/// List the configured template sources in persisted order
async fn run_sources(registry: &SourceRegistry) -> anyhow::Result<()> {
    let sources = registry
        .load()
        .await
        .context("failed to load configured sources")?;
    if sources.is_empty() {
        println!("No sources configured");
        return Ok(());
    }
    for source in &sources {
        println!("  - {source}");
    }
    Ok(())
}

async fn run_add(registry: &SourceRegistry, args: SourceArgs) -> anyhow::Result<()> {
    let source = args.into_source()?;
    registry
        .add(source.clone())
        .await
        .with_context(|| format!("failed to add source {source}"))?;
    println!("Added source {source}");
    Ok(())
}

async fn run_remove(registry: &SourceRegistry, args: SourceArgs) -> anyhow::Result<()> {
    let source = args.into_source()?;
    let removed = registry
        .remove(&source)
        .await
        .with_context(|| format!("failed to remove source {source}"))?;
    if removed {
        println!("Removed source {source}");
    } else {
        println!("Source to remove was not found in sources");
    }
    Ok(())
}

/// Create a new project from an installed template
async fn run_new(
    registry: &SourceRegistry,
    cache: CacheLayout,
    template_name: &str,
    dest: &std::path::Path,
    project_name: &str,
    properties: &[String],
) -> anyhow::Result<()> {
    let extra = parse_properties(properties)?;
    let scan = scan_catalog(registry, cache.clone()).await?;
    let template = scan
        .find(template_name)
        .with_context(|| format!("template not found [{template_name}]"))?;

    info!(template = %template.name, "creating project");
    let creator = ProjectCreator::new(cache);
    let destination = creator
        .create_project(template, dest, project_name, &extra)
        .await
        .with_context(|| format!("failed to create project [{project_name}]"))?;

    println!("Created {} at {}", project_name, destination.display());
    Ok(())
}

async fn scan_catalog(registry: &SourceRegistry, cache: CacheLayout) -> anyhow::Result<CatalogScan> {
    let sources = registry
        .load()
        .await
        .context("failed to load configured sources")?;
    let catalog = TemplateCatalog::new(cache);
    Ok(catalog.installed_templates(&sources).await)
}

/// Parse repeated `key=value` property arguments.
fn parse_properties(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut properties = HashMap::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid property [{pair}], expected key=value"))?;
        properties.insert(key.trim().to_string(), value.to_string());
    }
    Ok(properties)
}
