//! Configuration file parsing, overrides and validation
//!
//! This module handles:
//! - Config file discovery from multiple locations
//! - TOML parsing with serde
//! - Resolving relative paths against the config file's directory
//! - Command-line overrides
//! - Validation and error reporting

mod discovery;
mod overrides;
mod types;
mod validation;


use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

pub use discovery::{ConfigDiscovery, ConfigFiles, PROJECT_CONFIG_NAME};
pub use overrides::ConfigOverrides;
pub use types::{Leaf, OneOrMany, PathSpec, SyncConfig};
pub use validation::ConfigValidator;

use crate::error::{Error, Result};

/// Configuration manager that coordinates discovery, parsing, overrides and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Discover, load, override and validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no config file is found, or if it is invalid or
    /// cannot be read.
    pub fn load(cli_config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<SyncConfig> {
        if let Some(path) = cli_config_path
            && !path.is_file()
        {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let files = ConfigDiscovery::discover(cli_config_path);
        let path = files.preferred().ok_or_else(|| {
            Error::invalid_config(format!(
                "No configuration found (pass --config or create {PROJECT_CONFIG_NAME})"
            ))
        })?;

        tracing::debug!(config = %path.display(), "Loading configuration");

        // Relative override paths resolve against the config directory as well
        let (config, base) = Self::read(path)?;
        let config = overrides.apply(config)?.resolved_against(&base);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    fn read(path: &Path) -> Result<(SyncConfig, PathBuf)> {
        let path = dunce::canonicalize(path)
            .with_context(|| format!("Failed to resolve config path: {}", path.display()))?;

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok((config, base))
    }

    /// Parse TOML configuration text without resolving paths
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or misses required keys.
    pub fn parse(content: &str) -> Result<SyncConfig> {
        Ok(toml::from_str(content)?)
    }
}
