//! Idempotent materialization of a mapping table into its output tree

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::comparison::FileHasher;
use crate::error::Result;
use crate::mapping::Mapper;

/// Statistics for one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Destination did not exist and was created
    pub copied: usize,
    /// Destination existed with other content and was overwritten
    pub replaced: usize,
    /// Destination already held the recorded content
    pub unchanged: usize,
    /// Source vanished since the table was built
    pub stale: usize,
    /// Directories or special files removed from a mapped slot
    pub cleared: usize,
}

impl ReconcileReport {
    /// Number of files written
    #[must_use]
    pub const fn total_writes(&self) -> usize {
        self.copied + self.replaced
    }
}

/// Copies mapping tables into the output tree
pub struct Reconciler;

impl Reconciler {
    /// Make every destination in `mapper` hold its source's bytes
    ///
    /// Entries are processed in source-path order. A destination whose
    /// content hash already equals the recorded hash is left alone, so a
    /// second pass with no intervening changes writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a destination cannot be cleared, created or
    /// written.
    pub fn reconcile(mapper: &Mapper) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for (source, entry) in mapper {
            if !source.is_file() {
                tracing::debug!(source = %source.display(), "Skipping stale mapping entry");
                report.stale += 1;
                continue;
            }

            let destination = &entry.output;
            let existing = fs::symlink_metadata(destination).ok();

            if existing.as_ref().is_some_and(|m| !m.is_file()) {
                tracing::debug!(path = %destination.display(), "Clearing non-file from mapped slot");
                remove_path(destination)?;
                report.cleared += 1;
            } else if existing.is_some() {
                if FileHasher::fingerprint(destination)?.as_ref() == Some(&entry.hash) {
                    report.unchanged += 1;
                    continue;
                }
                report.replaced += 1;
            } else {
                report.copied += 1;
            }

            tracing::info!(from = %source.display(), to = %destination.display(), "copy");
            copy_file(source, destination)?;

            if entry.readonly {
                set_readonly(destination, true)?;
            }
        }

        Ok(report)
    }
}

/// Copy `source` over `destination`, replacing whatever is there
///
/// # Errors
///
/// Returns an error if the destination cannot be cleared, its parent
/// directories cannot be created, or the copy fails.
pub fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    if fs::symlink_metadata(destination).is_ok() {
        remove_path(destination)?;
    } else if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::copy(source, destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;

    // Copies inherit the source mode; a read-only dependency copy must not
    // make later writes to this slot fail.
    set_readonly(destination, false)
}

/// Remove a file, symlink or directory tree
///
/// Read-only files are made writable first. A missing path is not an error.
///
/// # Errors
///
/// Returns an error if the path exists and cannot be removed.
pub fn remove_path(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    } else {
        if metadata.is_file() && metadata.permissions().readonly() {
            set_readonly(path, false)?;
        }
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }

    Ok(())
}

/// Toggle the write permission of a regular file
pub(crate) fn set_readonly(path: &Path, readonly: bool) -> Result<()> {
    let mut permissions = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .permissions();

    if permissions.readonly() == readonly {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = permissions.mode();
        permissions.set_mode(if readonly { mode & !0o222 } else { mode | 0o200 });
    }
    #[cfg(not(unix))]
    permissions.set_readonly(readonly);

    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Leaf;
    use crate::mapping::PathMapper;
    use crate::scanner::IgnoreMatcher;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested/b.txt"), "b").unwrap();
        (tmp, src, out)
    }

    fn map(src: &Path, out: &Path, readonly: bool) -> Mapper {
        let ignores = IgnoreMatcher::new();
        PathMapper::new(out, &ignores)
            .map(&[Leaf::Path(src.to_path_buf())], readonly)
            .unwrap()
    }

    #[test]
    fn test_reconcile_copies_tree() {
        let (_tmp, src, out) = setup();
        let mapper = map(&src, &out, false);

        let report = Reconciler::reconcile(&mapper).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(fs::read_to_string(out.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_second_pass_writes_nothing() {
        let (_tmp, src, out) = setup();
        let mapper = map(&src, &out, false);

        Reconciler::reconcile(&mapper).unwrap();
        let second = Reconciler::reconcile(&mapper).unwrap();

        assert_eq!(second.total_writes(), 0);
        assert_eq!(second.unchanged, 2);
    }

    #[test]
    fn test_reconcile_replaces_edited_destination() {
        let (_tmp, src, out) = setup();
        let mapper = map(&src, &out, false);
        Reconciler::reconcile(&mapper).unwrap();

        fs::write(out.join("a.txt"), "edited").unwrap();
        let report = Reconciler::reconcile(&mapper).unwrap();

        assert_eq!(report.replaced, 1);
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "a");
    }

    #[test]
    fn test_reconcile_clears_directory_in_slot() {
        let (_tmp, src, out) = setup();
        fs::create_dir_all(out.join("a.txt/inner")).unwrap();
        fs::write(out.join("a.txt/inner/x"), "x").unwrap();

        let report = Reconciler::reconcile(&map(&src, &out, false)).unwrap();

        assert_eq!(report.cleared, 1);
        assert!(out.join("a.txt").is_file());
    }

    #[test]
    fn test_reconcile_skips_stale_entry() {
        let (_tmp, src, out) = setup();
        let mapper = map(&src, &out, false);
        fs::remove_file(src.join("a.txt")).unwrap();

        let report = Reconciler::reconcile(&mapper).unwrap();
        assert_eq!(report.stale, 1);
        assert_eq!(report.copied, 1);
        assert!(!out.join("a.txt").exists());
    }

    #[test]
    fn test_readonly_entries() {
        let (_tmp, src, out) = setup();
        let mapper = map(&src, &out, true);

        Reconciler::reconcile(&mapper).unwrap();
        assert!(fs::metadata(out.join("a.txt")).unwrap().permissions().readonly());

        // Re-pulling over a read-only copy must succeed
        fs::write(src.join("a.txt"), "a2").unwrap();
        let report = Reconciler::reconcile(&map(&src, &out, true)).unwrap();
        assert_eq!(report.replaced, 1);
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "a2");
    }

    #[test]
    fn test_remove_path_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(remove_path(&tmp.path().join("missing")).is_ok());
    }
}
