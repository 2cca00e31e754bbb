//! Command-line overrides applied on top of a loaded configuration

use std::path::PathBuf;

use super::types::SyncConfig;
use crate::error::{Error, Result};

/// Overrides collected from `--set key=value` and `--after <command>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `(key, value)` assignments in the order given
    pub assignments: Vec<(String, String)>,
    /// Extra post-sync commands appended after the configured ones
    pub after: Vec<String>,
}

impl ConfigOverrides {
    /// Parse `key=value` assignments
    ///
    /// # Errors
    ///
    /// Returns an error if an assignment has no `=`.
    pub fn parse<S: AsRef<str>>(assignments: &[S], after: &[String]) -> Result<Self> {
        let assignments = assignments
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                raw.split_once('=')
                    .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                    .ok_or_else(|| {
                        anyhow::Error::from(Error::invalid_config(format!(
                            "Override '{raw}' is not of the form key=value"
                        )))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            assignments,
            after: after.to_vec(),
        })
    }

    /// Apply the overrides to `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOverride`] for keys other than `name`,
    /// `output` and `dependency_base`.
    pub fn apply(&self, mut config: SyncConfig) -> Result<SyncConfig> {
        for (key, value) in &self.assignments {
            match key.as_str() {
                "name" => config.name.clone_from(value),
                "output" => config.output = PathBuf::from(value),
                "dependency_base" | "dependencyBase" => {
                    config.dependency_base =
                        (!value.is_empty()).then(|| PathBuf::from(value));
                }
                _ => return Err(Error::UnknownOverride { key: key.clone() }.into()),
            }
        }

        for command in &self.after {
            config.after.push(command.clone());
        }

        Ok(config)
    }
}
