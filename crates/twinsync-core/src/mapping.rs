//! Mapping tables from source files to their output-tree locations
//!
//! A [`Mapper`] is built in one pass by [`PathMapper::map`] and never
//! updated in place; the session swaps whole tables.

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::comparison::{ContentHash, FileHasher};
use crate::config::Leaf;
use crate::error::Result;
use crate::scanner::{IgnoreMatcher, Scanner};

/// One tracked file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Fingerprint of the source bytes when the table was built
    pub hash: ContentHash,
    /// Absolute location inside the output tree
    pub output: PathBuf,
    /// Output copy is made non-writable
    #[serde(default)]
    pub readonly: bool,
}

/// Table from absolute source path to its mapping entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapper {
    entries: BTreeMap<PathBuf, MappingEntry>,
}

impl Mapper {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry for `source`
    pub fn insert(&mut self, source: PathBuf, entry: MappingEntry) {
        self.entries.insert(source, entry);
    }

    /// Entry for a source path
    #[must_use]
    pub fn get(&self, source: &Path) -> Option<&MappingEntry> {
        self.entries.get(source)
    }

    /// Number of tracked files
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in source-path order
    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, MappingEntry> {
        self.entries.iter()
    }

    /// Every output path claimed by this table
    #[must_use]
    pub fn output_paths(&self) -> HashSet<&Path> {
        self.entries.values().map(|e| e.output.as_path()).collect()
    }

    /// Drop every entry whose output path is already claimed by `other`
    #[must_use]
    pub fn without_outputs_of(self, other: &Self) -> Self {
        let taken = other.output_paths();
        let entries = self
            .entries
            .into_iter()
            .filter(|(source, entry)| {
                let shadowed = taken.contains(entry.output.as_path());
                if shadowed {
                    tracing::debug!(
                        dependency = %source.display(),
                        output = %entry.output.display(),
                        "Dependency shadowed by source file"
                    );
                }
                !shadowed
            })
            .collect();
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a Mapper {
    type Item = (&'a PathBuf, &'a MappingEntry);
    type IntoIter = btree_map::Iter<'a, PathBuf, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(PathBuf, MappingEntry)> for Mapper {
    fn from_iter<I: IntoIterator<Item = (PathBuf, MappingEntry)>>(iter: I) -> Self {
        let mut mapper = Self::new();
        for (source, entry) in iter {
            mapper.insert(source, entry);
        }
        mapper
    }
}

/// Expands leaves into mapping tables under one output root
pub struct PathMapper<'a> {
    output_root: &'a Path,
    ignores: &'a IgnoreMatcher,
}

impl<'a> PathMapper<'a> {
    /// Create a mapper for `output_root`
    #[must_use]
    pub const fn new(output_root: &'a Path, ignores: &'a IgnoreMatcher) -> Self {
        Self {
            output_root,
            ignores,
        }
    }

    /// Build a fresh table from `leaves`
    ///
    /// Every regular file beneath each leaf gets an entry with a freshly
    /// computed hash and the given `readonly` flag. Leaves missing on disk
    /// contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a discovered file cannot be read for hashing.
    pub fn map(&self, leaves: &[Leaf], readonly: bool) -> Result<Mapper> {
        let scanner = Scanner::new(self.ignores);
        let mut mapper = Mapper::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for leaf in leaves {
            let root = leaf.source();
            let scan = scanner.scan(root);
            if scan.files.is_empty() {
                tracing::debug!(leaf = %root.display(), "Leaf contributes no files");
            }

            for file in scan.files {
                // Vanished between walk and hash: the next diff reports it.
                let Some(hash) = FileHasher::fingerprint(&file)? else {
                    continue;
                };
                let output = self.output_path(leaf, &file);
                // `previous` may since have been re-keyed to another output
                if let Some(previous) = claimed.insert(output.clone(), file.clone())
                    && previous != file
                    && mapper.get(&previous).is_some_and(|e| e.output == output)
                {
                    tracing::warn!(
                        output = %output.display(),
                        replaced = %previous.display(),
                        by = %file.display(),
                        "Two sources map to the same output path; keeping the later one"
                    );
                    mapper.entries.remove(&previous);
                }
                mapper.insert(
                    file,
                    MappingEntry {
                        hash,
                        output,
                        readonly,
                    },
                );
            }
        }

        Ok(mapper)
    }

    /// Output location of `file` discovered beneath `leaf`
    #[must_use]
    pub fn output_path(&self, leaf: &Leaf, file: &Path) -> PathBuf {
        let root = leaf.source();
        let mut output = self.output_root.to_path_buf();
        if let Some(target) = leaf.target() {
            output.push(target);
        }

        if file == root {
            if let Some(name) = file.file_name() {
                output.push(name);
            }
        } else if let Ok(relative) = file.strip_prefix(root) {
            output.push(relative);
        }

        output
    }
}
