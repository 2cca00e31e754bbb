//! Configuration validation and error reporting

use super::types::SyncConfig;
use crate::error::{Error, Result};
use crate::scanner::{IgnoreMatcher, IgnoreRule};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(config: &SyncConfig) -> Result<()> {
        if config.name.trim().is_empty() {
            return Err(Error::invalid_config("name cannot be empty").into());
        }

        if config.output.as_os_str().is_empty() {
            return Err(Error::invalid_config("output cannot be empty").into());
        }

        for (idx, leaf) in config
            .source_leaves()
            .iter()
            .chain(config.dependencies.leaves().iter())
            .enumerate()
        {
            if leaf.source().as_os_str().is_empty() {
                return Err(
                    Error::invalid_config(format!("Path entry #{} has an empty source", idx + 1))
                        .into(),
                );
            }
        }

        let rules = config.ignore_rules();
        for rule in &rules {
            let empty = match rule {
                IgnoreRule::Exact(path) => path.as_os_str().is_empty(),
                IgnoreRule::Prefix { prefix } => prefix.is_empty(),
                IgnoreRule::Suffix { suffix } => suffix.is_empty(),
                IgnoreRule::Regex { regex } => regex.is_empty(),
                IgnoreRule::Glob { glob } => glob.trim().is_empty(),
            };
            if empty {
                return Err(Error::invalid_config("Ignore rule cannot be empty").into());
            }
        }

        IgnoreMatcher::from_rules(&rules)?;

        Ok(())
    }
}
