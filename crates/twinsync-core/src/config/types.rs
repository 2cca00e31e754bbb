//! Configuration types and structures

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scanner::IgnoreRule;

/// One item of a path specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Leaf {
    /// A file or directory mapped straight under the output root
    Path(PathBuf),
    /// A file or directory mapped under `output/<target>`
    Rebase {
        /// File or directory to read from
        source: PathBuf,
        /// Sub-prefix below the output root
        target: PathBuf,
    },
}

impl Leaf {
    /// Path the leaf reads from
    #[must_use]
    pub fn source(&self) -> &Path {
        match self {
            Self::Path(path) | Self::Rebase { source: path, .. } => path,
        }
    }

    /// Sub-prefix below the output root, if any
    #[must_use]
    pub fn target(&self) -> Option<&Path> {
        match self {
            Self::Path(_) => None,
            Self::Rebase { target, .. } => Some(target),
        }
    }

    /// Same leaf with its source joined onto `base`
    ///
    /// Absolute sources are left unchanged.
    #[must_use]
    pub fn rebased_onto(&self, base: &Path) -> Self {
        match self {
            Self::Path(path) => Self::Path(base.join(path)),
            Self::Rebase { source, target } => Self::Rebase {
                source: base.join(source),
                target: target.clone(),
            },
        }
    }
}

/// A path specification: one leaf or a list of leaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    /// A single leaf
    One(Leaf),
    /// Several leaves, mapped in order
    Many(Vec<Leaf>),
}

impl PathSpec {
    /// Normalize into a flat list of leaves
    #[must_use]
    pub fn leaves(&self) -> Vec<Leaf> {
        match self {
            Self::One(leaf) => vec![leaf.clone()],
            Self::Many(leaves) => leaves.clone(),
        }
    }

    /// True when the spec names no leaf at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(leaves) if leaves.is_empty())
    }
}

impl Default for PathSpec {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// A value that may be written either alone or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value
    One(T),
    /// A list of values
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Flatten into a list
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }

    /// Append a value, promoting a single value to a list
    pub fn push(&mut self, value: T) {
        let mut values = self.to_vec();
        values.push(value);
        *self = Self::Many(values);
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Project name, used in reports
    pub name: String,

    /// Output (working/build) directory
    pub output: PathBuf,

    /// Authoritative project files
    #[serde(default, alias = "source")]
    pub sources: PathSpec,

    /// Read-only files overlaid into the output tree
    #[serde(default)]
    pub dependencies: PathSpec,

    /// Prefix joined onto every dependency source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_base: Option<PathBuf>,

    /// Shell commands run inside the output directory after materializing it
    #[serde(default)]
    pub after: OneOrMany<String>,

    /// Paths excluded from every scan
    #[serde(default)]
    pub ignores: OneOrMany<IgnoreRule>,
}

impl SyncConfig {
    /// Create a configuration with no sources, dependencies or hooks
    #[must_use]
    pub fn new(name: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            sources: PathSpec::default(),
            dependencies: PathSpec::default(),
            dependency_base: None,
            after: OneOrMany::default(),
            ignores: OneOrMany::default(),
        }
    }

    /// Source leaves in declaration order
    #[must_use]
    pub fn source_leaves(&self) -> Vec<Leaf> {
        self.sources.leaves()
    }

    /// Dependency leaves with `dependency_base` applied
    #[must_use]
    pub fn dependency_leaves(&self) -> Vec<Leaf> {
        let leaves = self.dependencies.leaves();
        match &self.dependency_base {
            Some(base) => leaves.iter().map(|leaf| leaf.rebased_onto(base)).collect(),
            None => leaves,
        }
    }

    /// Non-empty post-sync commands in declaration order
    #[must_use]
    pub fn after_commands(&self) -> Vec<String> {
        self.after
            .to_vec()
            .into_iter()
            .filter(|command| !command.trim().is_empty())
            .collect()
    }

    /// Configured ignore rules
    #[must_use]
    pub fn ignore_rules(&self) -> Vec<IgnoreRule> {
        self.ignores.to_vec()
    }

    /// Resolve every relative path in the configuration against `base`
    ///
    /// Prefix, suffix, regex and glob rules are string predicates and are
    /// left untouched.
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        self.output = base.join(&self.output);
        self.sources = resolve_spec(&self.sources, base);
        match self.dependency_base.take() {
            Some(dep_base) => self.dependency_base = Some(base.join(dep_base)),
            None => self.dependencies = resolve_spec(&self.dependencies, base),
        }
        self.ignores = OneOrMany::Many(
            self.ignores
                .to_vec()
                .into_iter()
                .map(|rule| rule.resolved_against(base))
                .collect(),
        );
        self
    }
}

fn resolve_spec(spec: &PathSpec, base: &Path) -> PathSpec {
    match spec {
        PathSpec::One(leaf) => PathSpec::One(leaf.rebased_onto(base)),
        PathSpec::Many(leaves) => {
            PathSpec::Many(leaves.iter().map(|leaf| leaf.rebased_onto(base)).collect())
        }
    }
}
