//! Common types and utilities for command execution

use std::path::Path;

use anyhow::Context;
use twinsync_core::config::{ConfigManager, ConfigOverrides, SyncConfig};
use twinsync_core::sync::{Session, Startup, SyncReporter};

/// Options shared by every subcommand
pub struct CommandOptions<'a> {
    /// Enable verbose output
    pub verbose: bool,
    /// Path to custom config file
    pub config_path: Option<&'a Path>,
    /// Raw `key=value` overrides
    pub set: &'a [String],
    /// Extra post-sync commands
    pub after: &'a [String],
}

impl<'a> CommandOptions<'a> {
    /// Create new command options
    #[must_use]
    pub const fn new(
        verbose: bool,
        config_path: Option<&'a Path>,
        set: &'a [String],
        after: &'a [String],
    ) -> Self {
        Self {
            verbose,
            config_path,
            set,
            after,
        }
    }

    /// Discover and load the configuration with overrides applied
    pub fn load_config(&self) -> anyhow::Result<SyncConfig> {
        let overrides = ConfigOverrides::parse(self.set, self.after)?;
        let config = ConfigManager::load(self.config_path, &overrides)
            .context("Failed to load configuration")?;

        if self.verbose {
            println!("Project: {}", config.name);
            println!("Output:  {}", config.output.display());
        }

        Ok(config)
    }

    /// Open a session on the existing output tree
    pub fn attach(&self) -> anyhow::Result<Session> {
        let (session, startup) = Session::attach(self.load_config()?)?;
        report_startup(&session, &startup);
        Ok(session)
    }
}

/// Print what happened while a session came up
pub fn report_startup(session: &Session, startup: &Startup) {
    match startup {
        Startup::Fresh {
            dependencies,
            sources,
            commands,
        } => {
            println!("{}", SyncReporter::generate_summary("Dependencies", dependencies));
            println!("{}", SyncReporter::generate_summary("Sources", sources));
            for outcome in commands {
                println!("> {}", outcome.command);
                if !outcome.stdout.is_empty() {
                    print!("{}", outcome.stdout);
                }
                if !outcome.stderr.is_empty() {
                    eprint!("{}", outcome.stderr);
                }
            }
            if !commands.is_empty() {
                print!("{}", SyncReporter::describe_commands(commands));
            }
        }
        Startup::Attached => {}
        Startup::Recovered { changes } => {
            println!(
                "Recovered {} pending change(s) from {}",
                changes.len(),
                session.ledger_path().display()
            );
            print!("{}", SyncReporter::describe_changes(changes));
        }
    }
}
