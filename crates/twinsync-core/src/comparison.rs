//! Content fingerprints, drift detection and text diffs
//!
//! This module provides read-only analysis of files:
//! - SHA-256 content fingerprints
//! - Classification of output-tree drift into new, changed and deleted files
//! - Line diffs for showing what an edit did

mod changes;
mod hash;
mod patch;

pub use changes::{Change, ChangeKind, ChangeSet, DiffEngine};
pub use hash::{ContentHash, FileHasher};
pub use patch::DiffGenerator;
