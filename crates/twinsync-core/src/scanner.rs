//! Directory walking for source, dependency and output trees
//!
//! Only regular files are yielded. Symbolic links are never followed and,
//! like other special files, are skipped with a warning. Ignore rules are
//! applied at every level so an ignored directory prunes its whole subtree.

mod rules;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub use rules::{IgnoreMatcher, IgnoreRule};

/// Result of a scan with non-fatal warnings
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Regular files found, in walk order
    pub files: Vec<PathBuf>,
    /// Skipped entries and walk errors
    pub warnings: Vec<String>,
}

/// Recursive file scanner honoring ignore rules
pub struct Scanner<'a> {
    ignores: &'a IgnoreMatcher,
}

impl<'a> Scanner<'a> {
    /// Create a scanner using the given ignore rules
    #[must_use]
    pub const fn new(ignores: &'a IgnoreMatcher) -> Self {
        Self { ignores }
    }

    /// Enumerate every regular file at or beneath `root`
    ///
    /// A missing root yields an empty result. A root that is itself a file
    /// yields just that file.
    #[must_use]
    pub fn scan(&self, root: &Path) -> ScanResult {
        let mut result = ScanResult::default();

        let Ok(metadata) = fs::symlink_metadata(root) else {
            tracing::debug!(root = %root.display(), "Scan root does not exist");
            return result;
        };

        if self.ignores.is_ignored(root, metadata.is_dir()) {
            tracing::debug!(root = %root.display(), "Scan root is ignored");
            return result;
        }

        if metadata.is_file() {
            result.files.push(root.to_path_buf());
            return result;
        }

        if !metadata.is_dir() {
            let warning = format!("Unsupported path type: {}", root.display());
            tracing::warn!("{warning}");
            result.warnings.push(warning);
            return result;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !self
                        .ignores
                        .is_ignored(entry.path(), entry.file_type().is_dir())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    result.warnings.push(format!("Failed to walk directory: {e}"));
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_file() {
                result.files.push(entry.into_path());
            } else if !file_type.is_dir() {
                result
                    .warnings
                    .push(format!("Unsupported path type: {}", entry.path().display()));
            }
        }

        for warning in &result.warnings {
            tracing::warn!("{warning}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, rel).unwrap();
        path
    }

    #[test]
    fn test_scan_nested_tree() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.txt");
        touch(tmp.path(), "sub/b.txt");
        touch(tmp.path(), "sub/deeper/c.txt");

        let ignores = IgnoreMatcher::new();
        let result = Scanner::new(&ignores).scan(tmp.path());

        assert_eq!(result.files.len(), 3);
        assert!(result.files.iter().any(|p| p.ends_with("sub/deeper/c.txt")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_missing_root() {
        let tmp = TempDir::new().unwrap();
        let ignores = IgnoreMatcher::new();
        let result = Scanner::new(&ignores).scan(&tmp.path().join("missing"));

        assert!(result.files.is_empty());
    }

    #[test]
    fn test_scan_file_root() {
        let tmp = TempDir::new().unwrap();
        let file = touch(tmp.path(), "single.txt");

        let ignores = IgnoreMatcher::new();
        let result = Scanner::new(&ignores).scan(&file);

        assert_eq!(result.files, vec![file]);
    }

    #[test]
    fn test_ignored_directory_prunes_subtree() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep.txt");
        touch(tmp.path(), "cache/one.bin");
        touch(tmp.path(), "cache/nested/two.bin");

        let ignores =
            IgnoreMatcher::from_rules(&[IgnoreRule::Exact(tmp.path().join("cache"))]).unwrap();
        let result = Scanner::new(&ignores).scan(tmp.path());

        assert_eq!(result.files, vec![tmp.path().join("keep.txt")]);
    }

    #[test]
    fn test_ignored_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "file.txt");

        let ignores =
            IgnoreMatcher::from_rules(&[IgnoreRule::Exact(tmp.path().to_path_buf())]).unwrap();
        let result = Scanner::new(&ignores).scan(tmp.path());

        assert!(result.files.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let target = touch(tmp.path(), "real/file.txt");
        std::os::unix::fs::symlink(&target, tmp.path().join("link.txt")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("linkdir")).unwrap();

        let ignores = IgnoreMatcher::new();
        let result = Scanner::new(&ignores).scan(tmp.path());

        assert_eq!(result.files, vec![target]);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_root_is_reported() {
        let tmp = TempDir::new().unwrap();
        let target = touch(tmp.path(), "real.txt");
        let link = tmp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let ignores = IgnoreMatcher::new();
        let result = Scanner::new(&ignores).scan(&link);

        assert!(result.files.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Unsupported path type"));
    }
}
