//! Drift detection between the output tree and the recorded mapping tables

use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::hash::{ContentHash, FileHasher};
use crate::config::Leaf;
use crate::error::Result;
use crate::mapping::Mapper;
use crate::scanner::{IgnoreMatcher, Scanner};

/// Classification of one drifted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Untracked file in the output tree
    New,
    /// Tracked file whose output bytes differ from the recorded hash
    Changed,
    /// Tracked file whose output copy has vanished
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Deleted => "deleted",
        };
        f.write_str(tag)
    }
}

/// One drifted file, keyed in a [`ChangeSet`] by its source path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What happened to the output copy
    pub kind: ChangeKind,
    /// Location inside the output tree
    pub output: PathBuf,
    /// Hash recorded in the mapping table; absent for new files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
    /// Output copy has vanished
    #[serde(default)]
    pub deleted: bool,
}

impl Change {
    fn new(kind: ChangeKind, output: PathBuf, hash: Option<ContentHash>) -> Self {
        Self {
            kind,
            output,
            hash,
            deleted: kind == ChangeKind::Deleted,
        }
    }
}

/// Result of a diff pass: source path to change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<PathBuf, Change>,
}

impl ChangeSet {
    /// Empty change set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change for `source`
    pub fn insert(&mut self, source: PathBuf, change: Change) {
        self.changes.insert(source, change);
    }

    /// Change recorded for `source`
    #[must_use]
    pub fn get(&self, source: &Path) -> Option<&Change> {
        self.changes.get(source)
    }

    /// Number of drifted files
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True when nothing drifted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes in source-path order
    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, Change> {
        self.changes.iter()
    }

    /// Number of changes of one kind
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.values().filter(|c| c.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = (&'a PathBuf, &'a Change);
    type IntoIter = btree_map::Iter<'a, PathBuf, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Where untracked output files under a prefix originate from
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceRoot {
    output_prefix: PathBuf,
    source_root: PathBuf,
}

/// Compares the output tree against the mapping tables
pub struct DiffEngine<'a> {
    output_root: &'a Path,
    source_leaves: &'a [Leaf],
    ignores: &'a IgnoreMatcher,
}

impl<'a> DiffEngine<'a> {
    /// Create a diff engine for one output tree
    #[must_use]
    pub const fn new(
        output_root: &'a Path,
        source_leaves: &'a [Leaf],
        ignores: &'a IgnoreMatcher,
    ) -> Self {
        Self {
            output_root,
            source_leaves,
            ignores,
        }
    }

    /// Classify every drifted file
    ///
    /// Dependency entries only count towards the expected set; their own
    /// drift is never reported since they are re-pulled instead.
    ///
    /// # Errors
    ///
    /// Returns an error if an output file cannot be read for hashing.
    pub fn diff(&self, sources: &Mapper, dependencies: &Mapper) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        let observed = Scanner::new(self.ignores).scan(self.output_root).files;
        let expected: HashSet<&Path> = sources
            .output_paths()
            .union(&dependencies.output_paths())
            .copied()
            .collect();

        let roots = self.source_roots();
        for file in observed {
            if expected.contains(file.as_path()) {
                continue;
            }

            match Self::synthesize_source(&roots, &file) {
                Some(source) => {
                    tracing::info!(source = %source.display(), output = %file.display(), "new");
                    changes.insert(source, Change::new(ChangeKind::New, file, None));
                }
                None => tracing::warn!(
                    output = %file.display(),
                    "Untracked output file is not covered by any source entry"
                ),
            }
        }

        for (source, entry) in sources {
            match FileHasher::fingerprint(&entry.output)? {
                None => {
                    tracing::info!(source = %source.display(), output = %entry.output.display(), "deleted");
                    changes.insert(
                        source.clone(),
                        Change::new(ChangeKind::Deleted, entry.output.clone(), Some(entry.hash.clone())),
                    );
                }
                Some(current) if current != entry.hash => {
                    tracing::info!(source = %source.display(), output = %entry.output.display(), "changed");
                    changes.insert(
                        source.clone(),
                        Change::new(ChangeKind::Changed, entry.output.clone(), Some(entry.hash.clone())),
                    );
                }
                Some(_) => {}
            }
        }

        Ok(changes)
    }

    /// Output prefixes of the directory leaves with the directory each maps from
    ///
    /// A file leaf covers only itself, so it contributes no root. Untracked
    /// files beside its output copy would never be re-mapped after a push.
    fn source_roots(&self) -> Vec<SourceRoot> {
        self.source_leaves
            .iter()
            .filter_map(|leaf| {
                let source = leaf.source();
                if fs::symlink_metadata(source).is_ok_and(|m| m.is_file()) {
                    return None;
                }
                let source_root = source.to_path_buf();

                let mut output_prefix = self.output_root.to_path_buf();
                if let Some(target) = leaf.target() {
                    output_prefix.push(target);
                }

                Some(SourceRoot {
                    output_prefix,
                    source_root,
                })
            })
            .collect()
    }

    /// Source path an untracked output file would have come from
    ///
    /// The leaf with the longest matching output prefix wins; ties go to the
    /// leaf declared first.
    fn synthesize_source(roots: &[SourceRoot], observed: &Path) -> Option<PathBuf> {
        let mut best: Option<(&SourceRoot, &Path)> = None;

        for root in roots {
            let Ok(relative) = observed.strip_prefix(&root.output_prefix) else {
                continue;
            };
            let longer = best.is_none_or(|(current, _)| {
                root.output_prefix.components().count() > current.output_prefix.components().count()
            });
            if longer {
                best = Some((root, relative));
            }
        }

        best.map(|(root, relative)| root.source_root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PathMapper;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        src: PathBuf,
        out: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::create_dir_all(out.join("lib")).unwrap();
        for rel in ["main.txt", "lib/util.txt"] {
            fs::write(src.join(rel), rel).unwrap();
            fs::write(out.join(rel), rel).unwrap();
        }
        Fixture {
            _tmp: tmp,
            src,
            out,
        }
    }

    fn map(fx: &Fixture, leaves: &[Leaf], ignores: &IgnoreMatcher) -> Mapper {
        PathMapper::new(&fx.out, ignores).map(leaves, false).unwrap()
    }

    #[test]
    fn test_diff_clean_tree() {
        let fx = fixture();
        let leaves = vec![Leaf::Path(fx.src.clone())];
        let ignores = IgnoreMatcher::new();
        let sources = map(&fx, &leaves, &ignores);

        let changes = DiffEngine::new(&fx.out, &leaves, &ignores)
            .diff(&sources, &Mapper::new())
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_diff_classifies_changes() {
        let fx = fixture();
        let leaves = vec![Leaf::Path(fx.src.clone())];
        let ignores = IgnoreMatcher::new();
        let sources = map(&fx, &leaves, &ignores);

        fs::write(fx.out.join("main.txt"), "edited").unwrap();
        fs::remove_file(fx.out.join("lib/util.txt")).unwrap();
        fs::write(fx.out.join("lib/added.txt"), "added").unwrap();

        let changes = DiffEngine::new(&fx.out, &leaves, &ignores)
            .diff(&sources, &Mapper::new())
            .unwrap();

        assert_eq!(changes.len(), 3);
        assert_eq!(changes.get(&fx.src.join("main.txt")).unwrap().kind, ChangeKind::Changed);

        let deleted = changes.get(&fx.src.join("lib/util.txt")).unwrap();
        assert_eq!(deleted.kind, ChangeKind::Deleted);
        assert!(deleted.deleted);

        let added = changes.get(&fx.src.join("lib/added.txt")).unwrap();
        assert_eq!(added.kind, ChangeKind::New);
        assert_eq!(added.output, fx.out.join("lib/added.txt"));
        assert_eq!(added.hash, None);
    }

    #[test]
    fn test_new_file_under_rebase_target_but_not_beside_file_leaf() {
        let fx = fixture();
        let leaves = vec![
            Leaf::Path(fx.src.join("main.txt")),
            Leaf::Rebase {
                source: fx.src.join("lib"),
                target: PathBuf::from("vendor"),
            },
        ];
        let ignores = IgnoreMatcher::new();

        fs::create_dir_all(fx.out.join("vendor/deep")).unwrap();
        fs::write(fx.out.join("vendor/deep/new.txt"), "n").unwrap();
        fs::write(fx.out.join("top.txt"), "t").unwrap();

        let roots = DiffEngine::new(&fx.out, &leaves, &ignores).source_roots();
        assert_eq!(
            DiffEngine::synthesize_source(&roots, &fx.out.join("vendor/deep/new.txt")),
            Some(fx.src.join("lib/deep/new.txt"))
        );
        assert_eq!(
            DiffEngine::synthesize_source(&roots, &fx.out.join("top.txt")),
            None
        );
    }

    #[test]
    fn test_dependency_outputs_are_expected_but_not_diffed() {
        let fx = fixture();
        let leaves = vec![Leaf::Path(fx.src.join("main.txt"))];
        let ignores = IgnoreMatcher::new();
        let sources = map(&fx, &leaves, &ignores);
        let dependencies = PathMapper::new(&fx.out, &ignores)
            .map(&[Leaf::Path(fx.src.join("lib"))], true)
            .unwrap();

        fs::write(fx.out.join("util.txt"), "dependency copy edited").unwrap();

        let changes = DiffEngine::new(&fx.out, &leaves, &ignores)
            .diff(&sources, &dependencies)
            .unwrap();

        // lib/util.txt in the output is neither a source nor a dependency output
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get(&fx.src.join("lib/util.txt")).unwrap().kind, ChangeKind::New);
    }

    #[test]
    fn test_change_serde_shape() {
        let mut changes = ChangeSet::new();
        changes.insert(
            PathBuf::from("/src/a"),
            Change::new(ChangeKind::Deleted, PathBuf::from("/out/a"), Some("h".to_string())),
        );

        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["/src/a"]["kind"], "deleted");
        assert_eq!(json["/src/a"]["deleted"], true);
        assert_eq!(json["/src/a"]["output"], "/out/a");
        assert_eq!(changes.count(ChangeKind::Deleted), 1);
    }
}
