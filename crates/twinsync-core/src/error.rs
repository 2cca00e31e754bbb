//! Error types for the twinsync core library

use std::path::PathBuf;

/// Result type alias using `anyhow::Error`
pub type Result<T> = anyhow::Result<T>;

/// Failures callers may want to match on after downcasting an `anyhow::Error`
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured output path exists but is not a directory
    #[error("Output path is not a directory: {path}")]
    OutputNotDirectory {
        /// Offending path
        path: PathBuf,
    },

    /// The output directory has not been materialized yet
    #[error("Output directory does not exist: {path} (run `init` first)")]
    OutputMissing {
        /// Expected output directory
        path: PathBuf,
    },

    /// The output tree has no saved mapping tables to adopt
    #[error("No recorded mapping state at {path} (run `init` first)")]
    StateMissing {
        /// Expected state file
        path: PathBuf,
    },

    /// An ignore rule could not be compiled
    #[error("Invalid ignore rule '{rule}': {message}")]
    InvalidIgnoreRule {
        /// The rule as written in the configuration
        rule: String,
        /// Compiler diagnostic
        message: String,
    },

    /// The configuration is structurally invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong
        message: String,
    },

    /// A `key=value` override named a key that cannot be overridden
    #[error("Unknown override key '{key}' (expected one of: name, output, dependency_base)")]
    UnknownOverride {
        /// Key as given on the command line
        key: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidConfig`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
