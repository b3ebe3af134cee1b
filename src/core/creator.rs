//! Project instantiation pipeline.
//!
//! `create_project` stages the template's files in an ephemeral workspace,
//! rewrites contents and paths there, and only then copies the result to the
//! destination. The workspace is removed on every exit path, and the
//! destination is untouched until the final copy, so an earlier failure
//! leaves nothing behind.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::core::error::{Error, Result};
use crate::core::expr::{Expr, PropertyBag};
use crate::core::resolver::SourceResolver;
use crate::core::selector;
use crate::core::template::Template;
use crate::infrastructure::cache::CacheLayout;
use crate::infrastructure::git::GitClient;
use crate::infrastructure::packages::PackageClient;

/// Instantiates templates into new project directories.
pub struct ProjectCreator {
    resolver: SourceResolver,
}

impl ProjectCreator {
    /// Creator with the default acquisition collaborators.
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

    /// Create a project from `template` under `dest_folder`.
    ///
    /// With `create_new_folder` the output lands in
    /// `dest_folder/project_name`; otherwise directly in `dest_folder`.
    /// Returns the directory the project was written to. Existing files at
    /// the destination are never overwritten.
    pub async fn create_project(
        &self,
        template: &Template,
        dest_folder: &Path,
        project_name: &str,
        extra_properties: &HashMap<String, String>,
    ) -> Result<PathBuf> {
        if template.create_new_folder && project_name.trim().is_empty() {
            return Err(Error::invalid_argument(
                "project name must not be blank when the template creates a new folder",
            ));
        }

        let properties = PropertyBag::for_project(extra_properties, project_name);

        let workspace = tempfile::Builder::new().prefix("stencil-").tempdir()?;
        debug!(workspace = %workspace.path().display(), "allocated staging workspace");

        let outcome = self
            .run_pipeline(template, workspace.path(), dest_folder, project_name, &properties)
            .await;

        // Removed here on success and failure alike; the TempDir guard is
        // only the backstop for panics.
        let cleanup = workspace.close();
        let destination = outcome?;
        cleanup?;

        info!(
            template = %template.name,
            destination = %destination.display(),
            "project created"
        );
        Ok(destination)
    }

    async fn run_pipeline(
        &self,
        template: &Template,
        workspace: &Path,
        dest_folder: &Path,
        project_name: &str,
        properties: &PropertyBag,
    ) -> Result<PathBuf> {
        // Stage: resolve the source and copy its selected files in.
        if !template.source.source_files.is_empty() {
            return Err(Error::unsupported(
                "a source file allow-list cannot be combined with exclude-based discovery",
            ));
        }
        let source_root = self
            .resolver
            .resolve(&template.source, template.manifest_dir())
            .await?;
        let selected = selector::select(&source_root, None, &template.excludes).await;
        debug!(
            files = selected.len(),
            root = %source_root.display(),
            "selected template files"
        );
        copy_files(&source_root, &selected, workspace).await?;

        apply_content_replacements(template, properties, workspace).await?;
        apply_path_replacements(template, properties, workspace).await?;

        // Only now is the destination touched.
        let destination = if template.create_new_folder {
            let nested = dest_folder.join(project_name);
            if !nested.exists() {
                fs::create_dir_all(&nested).await?;
            }
            nested
        } else {
            dest_folder.to_path_buf()
        };

        let (staged, _) = walk(workspace).await?;
        copy_files(workspace, &staged, &destination).await?;
        Ok(destination)
    }
}

/// Copy `files` (absolute paths under `root`) into `dest`, preserving paths
/// relative to `root` and creating intermediate directories. An existing
/// destination file is an error, never overwritten.
async fn copy_files(root: &Path, files: &[PathBuf], dest: &Path) -> Result<()> {
    for file in files {
        let rel = file.strip_prefix(root).map_err(|_| {
            Error::invalid_operation(format!(
                "selected file [{}] is outside of [{}]",
                file.display(),
                root.display()
            ))
        })?;
        let target = dest.join(rel);
        if target.exists() {
            return Err(Error::invalid_operation(format!(
                "refusing to overwrite existing file [{}]",
                target.display()
            )));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(file, &target).await?;
    }
    Ok(())
}

/// Breadth-first walk of `root`, returning all files and all directories in
/// top-down order.
async fn walk(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                dirs.push(path.clone());
                queue.push_back(path);
            } else {
                files.push(path);
            }
        }
    }
    Ok((files, dirs))
}

/// Apply the template's content rules to every staged file, one pass per
/// rule in declared order. Overlapping keys make the order observable, so it
/// is never reordered.
async fn apply_content_replacements(
    template: &Template,
    properties: &PropertyBag,
    workspace: &Path,
) -> Result<()> {
    let mut rules: Vec<(String, String)> = Vec::new();
    for replacement in &template.replacements {
        if let Some(value) = replacement.effective_value(properties) {
            rules.push((replacement.key.clone(), value));
        }
    }
    if rules.is_empty() {
        return Ok(());
    }

    let (files, _) = walk(workspace).await?;
    for file in &files {
        let bytes = fs::read(file).await?;
        // Substitution only applies to text; staged binaries pass through
        // untouched.
        let Ok(original) = String::from_utf8(bytes) else {
            continue;
        };
        let mut updated = original.clone();
        for (key, value) in &rules {
            updated = updated.replace(key.as_str(), value.as_str());
        }
        if updated != original {
            fs::write(file, updated).await?;
        }
    }
    Ok(())
}

/// Apply the template's path rules in declared order. Within one rule every
/// matching directory is renamed before any file, so file discovery operates
/// on the already-renamed tree.
async fn apply_path_replacements(
    template: &Template,
    properties: &PropertyBag,
    workspace: &Path,
) -> Result<()> {
    for rule in &template.path_replacements {
        // The rule key is itself an expression.
        let key = match Expr::parse(&rule.key).evaluate(properties) {
            Some(key) if !key.trim().is_empty() => key,
            _ => continue,
        };
        let Some(value) = rule.effective_value(properties) else {
            continue;
        };

        let (_, dirs) = walk(workspace).await?;
        for dir in &dirs {
            if dir.file_name().and_then(|n| n.to_str()) != Some(key.as_str()) {
                continue;
            }
            // Renaming a parent earlier in this rule leaves stale entries.
            if !dir.exists() {
                continue;
            }
            let renamed = replace_in_path(dir, &key, &value);
            if renamed.exists() {
                return Err(Error::invalid_operation(format!(
                    "rename target already exists [from={}, to={}]",
                    dir.display(),
                    renamed.display()
                )));
            }
            fs::rename(dir, &renamed).await?;
        }

        let (files, _) = walk(workspace).await?;
        for file in &files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.contains(key.as_str()) || !file.exists() {
                continue;
            }
            let renamed = replace_in_path(file, &key, &value);
            if renamed.exists() {
                return Err(Error::invalid_operation(format!(
                    "rename target already exists [from={}, to={}]",
                    file.display(),
                    renamed.display()
                )));
            }
            if let Some(parent) = renamed.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(file, &renamed).await?;
        }
    }
    Ok(())
}

fn replace_in_path(path: &Path, key: &str, value: &str) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::Replacement;
    use tempfile::TempDir;

    fn creator(cache: &TempDir) -> ProjectCreator {
        ProjectCreator::new(CacheLayout::new(cache.path()))
    }

    async fn write_source(root: &Path, files: &[(&str, &str)]) {
        for (path, content) in files {
            let path = root.join(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.unwrap();
            }
            fs::write(path, content).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_project_stages_substitutes_and_excludes() {
        let source = TempDir::new().unwrap();
        write_source(
            source.path(),
            &[("MyApp.csproj", "MyApp"), ("bin/x.dll", "binary")],
        )
        .await;

        let mut template = Template::from_folder("myapp", source.path());
        template.excludes.push("bin/*".to_string());
        template
            .replacements
            .push(Replacement::new("MyApp", "$ProjectName"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        assert_eq!(created, dest.path().join("Demo"));
        let content = fs::read_to_string(created.join("MyApp.csproj")).await.unwrap();
        assert_eq!(content, "Demo");
        assert!(!created.join("bin").exists());
    }

    #[tokio::test]
    async fn test_create_new_folder_false_writes_into_dest_directly() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("app.txt", "token")]).await;

        let mut template = Template::from_folder("flat", source.path());
        template.create_new_folder = false;

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        assert_eq!(created, dest.path());
        assert!(dest.path().join("app.txt").is_file());
        assert!(!dest.path().join("Demo").exists());
    }

    #[tokio::test]
    async fn test_existing_destination_file_fails_without_overwrite() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("app.txt", "new")]).await;

        let template = Template::from_folder("clash", source.path());

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(dest.path().join("Demo")).await.unwrap();
        fs::write(dest.path().join("Demo/app.txt"), "old").await.unwrap();

        let error = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::InvalidOperation(_)));
        let untouched = fs::read_to_string(dest.path().join("Demo/app.txt")).await.unwrap();
        assert_eq!(untouched, "old");
    }

    #[tokio::test]
    async fn test_source_file_allow_list_is_unsupported() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("app.txt", "x")]).await;

        let mut template = Template::from_folder("listed", source.path());
        template.source.source_files.push("app.txt".to_string());

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let error = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Unsupported(_)));
        // Failing before resolution leaves the destination untouched.
        assert!(!dest.path().join("Demo").exists());
    }

    #[tokio::test]
    async fn test_missing_source_folder_is_not_found() {
        let template = Template::from_folder("ghost", "/nonexistent/template");
        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let error = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::NotFound(_)));
        assert!(!dest.path().join("Demo").exists());
    }

    #[tokio::test]
    async fn test_blank_project_name_with_new_folder_is_invalid() {
        let template = Template::from_folder("unnamed", "/anywhere");
        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let error = creator(&cache)
            .create_project(&template, dest.path(), "  ", &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_rule_without_matching_property_leaves_content_unchanged() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("app.txt", "TokenStays")]).await;

        let mut template = Template::from_folder("noop", source.path());
        template
            .replacements
            .push(Replacement::new("TokenStays", "$Missing"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        let content = fs::read_to_string(created.join("app.txt")).await.unwrap();
        assert_eq!(content, "TokenStays");
    }

    #[tokio::test]
    async fn test_default_value_chain_falls_back_to_property() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("paths.txt", "../artifacts/out")]).await;

        let mut template = Template::from_folder("chained", source.path());
        template.replacements.push(Replacement::with_default(
            "../artifacts",
            "$Missing",
            "$Artifacts",
        ));

        let mut extra = HashMap::new();
        extra.insert("Artifacts".to_string(), "/build/artifacts".to_string());

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &extra)
            .await
            .unwrap();

        let content = fs::read_to_string(created.join("paths.txt")).await.unwrap();
        assert_eq!(content, "/build/artifacts/out");
    }

    #[tokio::test]
    async fn test_guid_rule_substitutes_fresh_identifier() {
        let source = TempDir::new().unwrap();
        let guid = "a9914dea-7cf2-4216-ba7e-fecb82baa627";
        write_source(source.path(), &[("project.txt", guid)]).await;

        let mut template = Template::from_folder("guid", source.path());
        template.replacements.push(Replacement::with_default(
            guid,
            "$ProjectGuid",
            "$NewGuid()",
        ));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        let content = fs::read_to_string(created.join("project.txt")).await.unwrap();
        assert_ne!(content, guid);
        assert!(uuid::Uuid::parse_str(&content).is_ok());
    }

    #[tokio::test]
    async fn test_path_rule_renames_directories_then_files() {
        let source = TempDir::new().unwrap();
        write_source(
            source.path(),
            &[
                ("WebApiProject/WebApiProject.csproj", "x"),
                ("WebApiProject/inner/keep.txt", "y"),
            ],
        )
        .await;

        let mut template = Template::from_folder("renamer", source.path());
        template
            .path_replacements
            .push(Replacement::new("WebApiProject", "$ProjectName"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        // The directory moved with its subtree intact, and the file inside
        // it was renamed after the directory.
        assert!(created.join("Demo/Demo.csproj").is_file());
        assert!(created.join("Demo/inner/keep.txt").is_file());
        assert!(!created.join("WebApiProject").exists());
    }

    #[tokio::test]
    async fn test_path_rule_with_absent_value_is_skipped() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("KeepName/file.txt", "x")]).await;

        let mut template = Template::from_folder("skipper", source.path());
        template
            .path_replacements
            .push(Replacement::new("KeepName", "$Missing"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        assert!(created.join("KeepName/file.txt").is_file());
    }

    #[tokio::test]
    async fn test_directory_rename_collision_is_invalid_operation() {
        let source = TempDir::new().unwrap();
        write_source(
            source.path(),
            &[("OldName/a.txt", "x"), ("Demo/b.txt", "y")],
        )
        .await;

        let mut template = Template::from_folder("collision", source.path());
        template
            .path_replacements
            .push(Replacement::new("OldName", "$ProjectName"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let error = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::InvalidOperation(_)));
        // The failure happened in the workspace; nothing reached the
        // destination.
        assert!(!dest.path().join("Demo").exists());
    }

    #[tokio::test]
    async fn test_content_rules_apply_in_declared_order() {
        let source = TempDir::new().unwrap();
        write_source(source.path(), &[("order.txt", "alpha")]).await;

        let mut template = Template::from_folder("ordered", source.path());
        template
            .replacements
            .push(Replacement::new("alpha", "beta"));
        template
            .replacements
            .push(Replacement::new("beta", "gamma"));

        let cache = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let created = creator(&cache)
            .create_project(&template, dest.path(), "Demo", &HashMap::new())
            .await
            .unwrap();

        // The first rule's output feeds the second rule.
        let content = fs::read_to_string(created.join("order.txt")).await.unwrap();
        assert_eq!(content, "gamma");
    }
}
