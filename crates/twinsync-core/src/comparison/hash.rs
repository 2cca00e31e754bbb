//! Content fingerprints using SHA-256

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Lowercase hex digest of a file's bytes
pub type ContentHash = String;

/// File hasher
pub struct FileHasher;

impl FileHasher {
    /// Compute the fingerprint of a file by streaming its contents
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn hash(path: &Path) -> Result<ContentHash> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buffer = [0; 8192];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint `path` if it is an existing regular file
    ///
    /// Missing paths, directories, symlinks and special files yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a regular file exists but cannot be read.
    pub fn fingerprint(path: &Path) -> Result<Option<ContentHash>> {
        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_file() => Self::hash(path).map(Some),
            _ => Ok(None),
        }
    }
}
