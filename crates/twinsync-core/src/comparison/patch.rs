//! Unified text diffs between a source file and its edited output copy

use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::Context;
use similar::{ChangeTag, TextDiff};

use crate::error::Result;

const DIFF_CONTEXT_LINES: usize = 3;

/// Renders line diffs for changed files
pub struct DiffGenerator;

impl DiffGenerator {
    /// Color-coded unified diff from `original` to `edited`
    ///
    /// A missing file on either side is treated as empty, so new and deleted
    /// files render as pure insertions or removals.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read as UTF-8 text.
    pub fn generate(original: &Path, edited: &Path) -> Result<String> {
        let before = read_or_empty(original)?;
        let after = read_or_empty(edited)?;
        Ok(Self::generate_from_content(&before, &after, original, edited))
    }

    /// Color-coded unified diff from string contents
    #[must_use]
    pub fn generate_from_content(
        before: &str,
        after: &str,
        original: &Path,
        edited: &Path,
    ) -> String {
        let diff = TextDiff::from_lines(before, after);
        let mut output = String::new();

        writeln!(output, "\x1b[1m--- {}\x1b[0m", original.display())
            .expect("Writing to String should never fail");
        writeln!(output, "\x1b[1m+++ {}\x1b[0m", edited.display())
            .expect("Writing to String should never fail");

        for (idx, group) in diff.grouped_ops(DIFF_CONTEXT_LINES).iter().enumerate() {
            if idx > 0 {
                output.push_str("...\n");
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let (sign, color) = match change.tag() {
                        ChangeTag::Delete => ("-", "\x1b[31m"),
                        ChangeTag::Insert => ("+", "\x1b[32m"),
                        ChangeTag::Equal => (" ", "\x1b[0m"),
                    };
                    let newline = if change.value().ends_with('\n') { "" } else { "\n" };
                    write!(output, "{color}{sign}{}{newline}\x1b[0m", change.value())
                        .expect("Writing to String should never fail");
                }
            }
        }

        output
    }
}

fn read_or_empty(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Ok(String::new());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}
