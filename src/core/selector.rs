//! Glob-based file selection under a template root.
//!
//! Selection walks the tree breadth-first with an explicit queue and
//! evaluates every pattern against each visited directory, so patterns are
//! directory-anchored glob fragments rather than full-tree matchers. The
//! result is the include set minus the exclude set, de-duplicated in
//! insertion order. Selection is best-effort: unreadable subtrees and
//! malformed patterns are skipped, never fatal.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Compute the files under `root` matching the include patterns and not
/// matching the exclude patterns.
///
/// `includes = None` (or an empty list) means "match everything". Every
/// pattern string may itself carry several `;`-separated patterns; the
/// pre-split and joined forms yield identical results.
pub async fn select(
    root: &Path,
    includes: Option<&[String]>,
    excludes: &[String],
) -> Vec<PathBuf> {
    let mut include_patterns = normalize(includes.unwrap_or(&[]));
    if include_patterns.is_empty() {
        include_patterns.push("*".to_string());
    }
    let exclude_patterns = normalize(excludes);

    let mut included = Vec::new();
    for pattern in &include_patterns {
        search_into(root, pattern, &mut included).await;
    }

    let mut excluded = Vec::new();
    for pattern in &exclude_patterns {
        search_into(root, pattern, &mut excluded).await;
    }

    included.retain(|path| !excluded.contains(path));
    included
}

/// Split `;`-joined pattern lists, trim, and drop empties and duplicates.
fn normalize(patterns: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in patterns {
        for part in raw.split(';') {
            let part = part.trim();
            if !part.is_empty() && !out.iter().any(|seen| seen == part) {
                out.push(part.to_string());
            }
        }
    }
    out
}

/// Breadth-first search for files matching `pattern` anchored at each
/// directory under `root`, accumulating non-duplicate matches.
async fn search_into(root: &Path, pattern: &str, matches: &mut Vec<PathBuf>) {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let anchored = format!(
            "{}/{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            pattern
        );
        if let Ok(entries) = glob::glob(&anchored) {
            // Per-entry glob errors are swallowed along with everything else.
            for path in entries.flatten() {
                if path.is_file() && !matches.contains(&path) {
                    matches.push(path);
                }
            }
        }

        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let path = entry.path();
                    if path.is_dir() {
                        queue.push_back(path);
                    }
                }
            }
            Err(error) => {
                debug!(dir = %dir.display(), %error, "skipping unreadable directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        for sub in ["src", "bin", "src/nested"] {
            fs::create_dir_all(dir.path().join(sub)).await.unwrap();
        }
        for file in [
            "MyApp.csproj",
            "readme.md",
            "src/main.rs",
            "src/nested/helper.rs",
            "bin/x.dll",
            "settings.user",
        ] {
            fs::write(dir.path().join(file), "content").await.unwrap();
        }
        dir
    }

    fn relative(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_default_include_matches_everything() {
        let dir = fixture().await;
        let selected = select(dir.path(), None, &[]).await;
        assert_eq!(selected.len(), 6);
    }

    #[tokio::test]
    async fn test_excludes_remove_matches() {
        let dir = fixture().await;
        let excludes = vec!["bin/*".to_string(), "*.user".to_string()];
        let selected = select(dir.path(), None, &excludes).await;
        let names = relative(dir.path(), &selected);

        assert_eq!(selected.len(), 4);
        assert!(!names.iter().any(|n| n.starts_with("bin")));
        assert!(!names.iter().any(|n| n.ends_with(".user")));
        assert!(names.contains(&"MyApp.csproj".to_string()));
    }

    #[tokio::test]
    async fn test_file_in_both_include_and_exclude_is_excluded() {
        let dir = fixture().await;
        let includes = vec!["*.csproj".to_string(), "*.user".to_string()];
        let excludes = vec!["*.user".to_string()];
        let selected = select(dir.path(), Some(includes.as_slice()), &excludes).await;
        let names = relative(dir.path(), &selected);

        assert_eq!(names, ["MyApp.csproj"]);
    }

    #[tokio::test]
    async fn test_joined_and_presplit_patterns_are_equivalent() {
        let dir = fixture().await;
        let joined = vec!["bin/*;*.user".to_string()];
        let split = vec!["bin/*".to_string(), "*.user".to_string()];

        let from_joined = select(dir.path(), None, &joined).await;
        let from_split = select(dir.path(), None, &split).await;
        assert_eq!(from_joined, from_split);
    }

    #[tokio::test]
    async fn test_overlapping_includes_deduplicate() {
        let dir = fixture().await;
        let includes = vec!["*.csproj".to_string(), "MyApp.*".to_string()];
        let selected = select(dir.path(), Some(includes.as_slice()), &[]).await;

        assert_eq!(relative(dir.path(), &selected), ["MyApp.csproj"]);
    }

    #[tokio::test]
    async fn test_selection_is_idempotent() {
        let dir = fixture().await;
        let excludes = vec!["bin/*".to_string()];
        let first = select(dir.path(), None, &excludes).await;
        let second = select(dir.path(), None, &excludes).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_root_selects_nothing() {
        let selected = select(Path::new("/nonexistent/root"), None, &[]).await;
        assert!(selected.is_empty());
    }
}
