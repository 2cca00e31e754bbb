use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Two-way source/output tree synchronizer
///
/// Materializes source and dependency files into an output directory, runs
/// post-sync commands there, and pushes edits made in the output back to the
/// sources
#[derive(Parser, Debug)]
#[command(name = "twinsync")]
#[command(about, long_about = None, version)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use specific config file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a config value (name, output, dependency_base)
    #[arg(short = 'o', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Extra post-sync command; init runs once and exits instead of opening the shell
    #[arg(short = 's', long, global = true, value_name = "CMD")]
    pub after: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Materialize the output tree and run post-sync commands
    Init,

    /// List edits made in the output tree
    Diff {
        /// Also print a unified diff for each changed file
        #[arg(short, long)]
        patch: bool,
    },

    /// Copy edits from the output tree back to the sources
    Push,

    /// Re-copy dependencies into the output tree
    Pull,

    /// Initialize, then read push/pull/diff/exit commands interactively (default)
    Shell,
}
