//! Configuration file discovery from multiple locations

use std::path::{Path, PathBuf};

/// File name searched for in the working directory and its parents
pub const PROJECT_CONFIG_NAME: &str = "twinsync.toml";

/// Configuration file locations in order of precedence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFiles {
    /// Config from CLI flag (highest precedence)
    pub cli: Option<PathBuf>,
    /// Project config (`twinsync.toml`)
    pub project: Option<PathBuf>,
    /// Global XDG config
    pub global: Option<PathBuf>,
}

impl ConfigFiles {
    /// The single file that will be loaded
    ///
    /// A configuration is replaced wholesale, never merged, so only the
    /// highest-precedence file counts.
    #[must_use]
    pub fn preferred(&self) -> Option<&Path> {
        self.cli
            .as_deref()
            .or(self.project.as_deref())
            .or(self.global.as_deref())
    }
}

/// Config file discovery
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover all available configuration files
    #[must_use]
    pub fn discover(cli_path: Option<&Path>) -> ConfigFiles {
        let cli = cli_path.filter(|p| p.is_file()).map(Path::to_path_buf);

        let project = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::find_upwards(&cwd, PROJECT_CONFIG_NAME));
        let global = Self::find_global_config();

        ConfigFiles {
            cli,
            project,
            global,
        }
    }

    /// Find `name` in `start` or any of its parent directories
    #[must_use]
    pub fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Find global config in XDG config directory
    fn find_global_config() -> Option<PathBuf> {
        let global_config = dirs::config_dir()?.join("twinsync").join("config.toml");
        global_config.is_file().then_some(global_config)
    }
}
