//! Ignore rules: exact path, prefix, suffix, regular expression and
//! gitignore-style glob

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One ignore rule as written in the configuration
///
/// A bare string is an exact path. Tables carry exactly one of `prefix`,
/// `suffix`, `regex` or `glob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IgnoreRule {
    /// Path must equal this path exactly
    Exact(PathBuf),
    /// Path string starts with this prefix
    Prefix {
        /// Prefix tested against the full path string
        prefix: String,
    },
    /// Path string ends with this suffix
    Suffix {
        /// Suffix tested against the full path string
        suffix: String,
    },
    /// Regular expression searched in the full path string
    Regex {
        /// Pattern source
        regex: String,
    },
    /// Gitignore-style glob
    Glob {
        /// Glob line, e.g. `*.tmp` or `node_modules/`
        glob: String,
    },
}

impl IgnoreRule {
    /// Resolve an exact rule against `base` when it is relative
    #[must_use]
    pub fn resolved_against(self, base: &Path) -> Self {
        match self {
            Self::Exact(path) if path.is_relative() => Self::Exact(base.join(path)),
            other => other,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Exact(path) => path.display().to_string(),
            Self::Prefix { prefix } => format!("prefix:{prefix}"),
            Self::Suffix { suffix } => format!("suffix:{suffix}"),
            Self::Regex { regex } => format!("regex:{regex}"),
            Self::Glob { glob } => format!("glob:{glob}"),
        }
    }
}

/// Compiled set of ignore rules
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    exact: Vec<PathBuf>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    regexes: Vec<Regex>,
    globs: Option<Gitignore>,
}

impl IgnoreMatcher {
    /// Matcher that ignores nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a list of rules
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIgnoreRule`] if a regex or glob does not compile.
    pub fn from_rules(rules: &[IgnoreRule]) -> Result<Self> {
        let mut matcher = Self::new();
        let mut builder = GitignoreBuilder::new("");
        let mut has_globs = false;

        for rule in rules {
            match rule {
                IgnoreRule::Exact(path) => matcher.exact.push(path.clone()),
                IgnoreRule::Prefix { prefix } => matcher.prefixes.push(prefix.clone()),
                IgnoreRule::Suffix { suffix } => matcher.suffixes.push(suffix.clone()),
                IgnoreRule::Regex { regex } => {
                    let compiled = Regex::new(regex).map_err(|e| Error::InvalidIgnoreRule {
                        rule: rule.describe(),
                        message: e.to_string(),
                    })?;
                    matcher.regexes.push(compiled);
                }
                IgnoreRule::Glob { glob } => {
                    builder
                        .add_line(None, glob)
                        .map_err(|e| Error::InvalidIgnoreRule {
                            rule: rule.describe(),
                            message: e.to_string(),
                        })?;
                    has_globs = true;
                }
            }
        }

        if has_globs {
            let globs = builder.build().map_err(|e| Error::InvalidIgnoreRule {
                rule: "glob set".to_string(),
                message: e.to_string(),
            })?;
            matcher.globs = Some(globs);
        }

        Ok(matcher)
    }

    /// Add one exact path to the matcher
    pub fn push_exact(&mut self, path: impl Into<PathBuf>) {
        self.exact.push(path.into());
    }

    /// Add one path-string prefix to the matcher
    pub fn push_prefix(&mut self, prefix: impl Into<String>) {
        self.prefixes.push(prefix.into());
    }

    /// Whether `path` is excluded from scanning
    ///
    /// Callers prune a directory's whole subtree when this returns true for it.
    #[must_use]
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return true;
        }

        let text = path.to_string_lossy();
        if self.prefixes.iter().any(|p| text.starts_with(p.as_str()))
            || self.suffixes.iter().any(|s| text.ends_with(s.as_str()))
            || self.regexes.iter().any(|r| r.is_match(&text))
        {
            return true;
        }

        self.globs
            .as_ref()
            .is_some_and(|gi| gi.matched(path, is_dir).is_ignore())
    }
}
