//! Session lifecycle: materialize, diff, push and pull one output tree

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::hooks::{self, CommandOutcome};
use super::ledger::{LEDGER_FILENAME, Ledger, STATE_FILENAME};
use super::reconcile::{ReconcileReport, Reconciler, copy_file, remove_path};
use crate::comparison::{ChangeKind, ChangeSet, DiffEngine, FileHasher};
use crate::config::{ConfigValidator, Leaf, SyncConfig};
use crate::error::{Error, Result};
use crate::mapping::{Mapper, PathMapper};
use crate::scanner::IgnoreMatcher;

/// How a session came up
#[derive(Debug)]
pub enum Startup {
    /// Output tree materialized from scratch
    Fresh {
        /// Dependency reconcile pass
        dependencies: ReconcileReport,
        /// Source reconcile pass
        sources: ReconcileReport,
        /// Post-sync command results
        commands: Vec<CommandOutcome>,
    },
    /// Tables adopted from the state saved by the last init, pull or push
    Attached,
    /// Tables adopted from the ledger left by an earlier run
    Recovered {
        /// Drift re-computed against the adopted tables
        changes: ChangeSet,
    },
}

/// Owns the configuration and both mapping tables for one output tree
#[derive(Debug)]
pub struct Session {
    config: SyncConfig,
    output: PathBuf,
    source_leaves: Vec<Leaf>,
    dependency_leaves: Vec<Leaf>,
    ignores: IgnoreMatcher,
    ledger: Ledger,
    sources: Mapper,
    dependencies: Mapper,
}

impl Session {
    /// Materialize the output tree, or recover it from the ledger
    ///
    /// On a fresh start dependencies are pulled, sources are copied and the
    /// post-sync commands run. When the ledger holds a usable record its
    /// tables are adopted as-is and only a diff is run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputNotDirectory`] if the output path is occupied
    /// by something other than a directory, or any I/O error from mapping
    /// and copying.
    pub fn init(config: SyncConfig) -> Result<(Self, Startup)> {
        let mut session = Self::prepare(config)?;
        session.ensure_output()?;

        if let Some(changes) = session.recover()? {
            session.save_state()?;
            return Ok((session, Startup::Recovered { changes }));
        }

        session.sources = session.map_sources()?;
        let dependencies = session.pull_dependencies()?;
        let sources = Reconciler::reconcile(&session.sources)?;
        session.save_state()?;
        let commands = session.run_after_commands();

        tracing::info!(
            name = %session.config.name,
            sources = session.sources.len(),
            dependencies = session.dependencies.len(),
            "Output tree materialized"
        );

        Ok((
            session,
            Startup::Fresh {
                dependencies,
                sources,
                commands,
            },
        ))
    }

    /// Open a session on an output tree materialized by an earlier `init`
    ///
    /// The tables come from the ledger when one is pending, otherwise from
    /// the state saved by the last init, pull or push. Sources are never
    /// re-mapped here, so upstream source edits cannot pass for output
    /// edits. Nothing is written to the output tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputMissing`] if the output directory does not
    /// exist, [`Error::OutputNotDirectory`] if it is not a directory, and
    /// [`Error::StateMissing`] if no tables were ever saved for it.
    pub fn attach(config: SyncConfig) -> Result<(Self, Startup)> {
        let mut session = Self::prepare(config)?;

        match fs::metadata(&session.output) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(Error::OutputNotDirectory {
                    path: session.output.clone(),
                }
                .into());
            }
            Err(_) => {
                return Err(Error::OutputMissing {
                    path: session.output.clone(),
                }
                .into());
            }
        }

        if let Some(changes) = session.recover()? {
            return Ok((session, Startup::Recovered { changes }));
        }

        let Some(state) = session.ledger.load_state() else {
            return Err(Error::StateMissing {
                path: session.ledger.state_path().to_path_buf(),
            }
            .into());
        };
        session.sources = state.source;
        session.dependencies = state.dependencies;
        Ok((session, Startup::Attached))
    }

    /// Re-map dependencies and copy them into the output tree
    ///
    /// Dependencies whose output path is claimed by a source are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency cannot be hashed or copied.
    pub fn pull(&mut self) -> Result<ReconcileReport> {
        let report = self.pull_dependencies()?;
        self.save_state()?;
        Ok(report)
    }

    /// Copy output-tree edits back into the source tree
    ///
    /// Afterwards sources are re-mapped and reconciled, so source files
    /// edited upstream since the last sync reach the output tree instead of
    /// being reported as drift. Returns the changes that were applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a source file cannot be written or removed.
    pub fn push(&mut self) -> Result<ChangeSet> {
        let changes = self.diff()?;

        for (source, change) in &changes {
            if change.kind == ChangeKind::Changed
                && let Some(recorded) = &change.hash
                && FileHasher::fingerprint(source)?.is_some_and(|current| &current != recorded)
            {
                tracing::warn!(
                    source = %source.display(),
                    "Source also changed since the last sync; the output copy wins"
                );
            }

            if change.deleted {
                if fs::symlink_metadata(source).is_ok() {
                    tracing::info!(source = %source.display(), "delete");
                    remove_path(source)?;
                }
            } else {
                tracing::info!(from = %change.output.display(), to = %source.display(), "push");
                copy_file(&change.output, source)?;
            }
        }

        self.sources = self.map_sources()?;
        let refreshed = Reconciler::reconcile(&self.sources)?;
        if refreshed.total_writes() > 0 {
            tracing::info!(writes = refreshed.total_writes(), "Output refreshed from sources");
        }

        let remaining = self.diff()?;
        if !remaining.is_empty() {
            tracing::warn!(remaining = remaining.len(), "Output tree still differs after push");
        }

        self.save_state()?;
        Ok(changes)
    }

    /// Classify output-tree drift and record it in the ledger
    ///
    /// # Errors
    ///
    /// Returns an error if an output file cannot be hashed or the ledger
    /// cannot be written.
    pub fn diff(&self) -> Result<ChangeSet> {
        let changes = DiffEngine::new(&self.output, &self.source_leaves, &self.ignores)
            .diff(&self.sources, &self.dependencies)?;
        self.ledger
            .persist(&self.sources, &self.dependencies, &changes)?;
        Ok(changes)
    }

    /// True when the output tree holds edits not yet pushed
    ///
    /// # Errors
    ///
    /// Same as [`Session::diff`].
    pub fn has_pending_changes(&self) -> Result<bool> {
        Ok(!self.diff()?.is_empty())
    }

    /// Run the configured post-sync commands in the output directory
    #[must_use]
    pub fn run_after_commands(&self) -> Vec<CommandOutcome> {
        hooks::run_after_commands(&self.config.after_commands(), &self.output)
    }

    /// Configuration this session was opened with
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Absolute output directory
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Current source mapping table
    #[must_use]
    pub const fn sources(&self) -> &Mapper {
        &self.sources
    }

    /// Current dependency mapping table
    #[must_use]
    pub const fn dependencies(&self) -> &Mapper {
        &self.dependencies
    }

    /// Location of the recovery sentinel
    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        self.ledger.path()
    }

    fn prepare(config: SyncConfig) -> Result<Self> {
        ConfigValidator::validate(&config)?;

        let output = absolute(&config.output)?;
        let source_leaves = absolute_leaves(config.source_leaves())?;
        let dependency_leaves = absolute_leaves(config.dependency_leaves())?;

        let rules = config
            .ignore_rules()
            .into_iter()
            .map(|rule| rule.resolved_against(&output))
            .collect::<Vec<_>>();
        let mut ignores = IgnoreMatcher::from_rules(&rules)?;

        // Ledger, state and their temp files never count as output edits
        let ledger = Ledger::new(&output);
        for name in [LEDGER_FILENAME, STATE_FILENAME] {
            ignores.push_prefix(output.join(name).to_string_lossy());
        }

        tracing::debug!(
            output = %output.display(),
            sources = source_leaves.len(),
            dependencies = dependency_leaves.len(),
            "Session prepared"
        );

        Ok(Self {
            config,
            output,
            source_leaves,
            dependency_leaves,
            ignores,
            ledger,
            sources: Mapper::new(),
            dependencies: Mapper::new(),
        })
    }

    fn ensure_output(&self) -> Result<()> {
        match fs::metadata(&self.output) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(Error::OutputNotDirectory {
                path: self.output.clone(),
            }
            .into()),
            Err(_) => fs::create_dir_all(&self.output).with_context(|| {
                format!("Failed to create output directory: {}", self.output.display())
            }),
        }
    }

    fn pull_dependencies(&mut self) -> Result<ReconcileReport> {
        self.dependencies = self.map_dependencies()?;
        let report = Reconciler::reconcile(&self.dependencies)?;
        tracing::info!(writes = report.total_writes(), "Dependencies pulled");
        Ok(report)
    }

    fn save_state(&self) -> Result<()> {
        self.ledger.save_state(&self.sources, &self.dependencies)
    }

    fn recover(&mut self) -> Result<Option<ChangeSet>> {
        let Some(record) = self.ledger.restore() else {
            return Ok(None);
        };

        self.sources = record.source;
        self.dependencies = record.dependencies;
        self.diff().map(Some)
    }

    fn map_sources(&self) -> Result<Mapper> {
        PathMapper::new(&self.output, &self.ignores).map(&self.source_leaves, false)
    }

    fn map_dependencies(&self) -> Result<Mapper> {
        let dependencies =
            PathMapper::new(&self.output, &self.ignores).map(&self.dependency_leaves, true)?;
        Ok(dependencies.without_outputs_of(&self.sources))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))
}

fn absolute_leaves(leaves: Vec<Leaf>) -> Result<Vec<Leaf>> {
    leaves
        .into_iter()
        .map(|leaf| {
            Ok(match leaf {
                Leaf::Path(path) => Leaf::Path(absolute(&path)?),
                Leaf::Rebase { source, target } => Leaf::Rebase {
                    source: absolute(&source)?,
                    target,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathSpec;
    use tempfile::TempDir;

    #[test]
    fn test_init_rejects_file_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out");
        fs::write(&output, "occupied").unwrap();

        let err = Session::init(SyncConfig::new("demo", &output)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::OutputNotDirectory { .. })
        ));
        assert_eq!(fs::read_to_string(&output).unwrap(), "occupied");
    }

    #[test]
    fn test_attach_requires_output() {
        let tmp = TempDir::new().unwrap();
        let err = Session::attach(SyncConfig::new("demo", tmp.path().join("out"))).unwrap_err();
        assert!(err.to_string().contains("run `init` first"));
    }

    #[test]
    fn test_attach_adopts_saved_tables_without_writing() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();

        let mut config = SyncConfig::new("demo", &out);
        config.sources = PathSpec::One(Leaf::Path(src.clone()));
        let (initial, _) = Session::init(config.clone()).unwrap();

        fs::write(src.join("a.txt"), "a v2").unwrap();
        fs::write(src.join("b.txt"), "b").unwrap();

        let (session, startup) = Session::attach(config).unwrap();
        assert!(matches!(startup, Startup::Attached));
        assert_eq!(session.sources(), initial.sources());
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "a");
        assert!(!out.join("b.txt").exists());
    }

    #[test]
    fn test_attach_without_saved_state_fails() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let err = Session::attach(SyncConfig::new("demo", &out)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::StateMissing { .. })
        ));
        assert!(err.to_string().contains("run `init` first"));
    }

    #[test]
    fn test_bookkeeping_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let (session, _) = Session::init(SyncConfig::new("demo", tmp.path().join("out"))).unwrap();
        let out = session.output();

        assert!(session.ignores.is_ignored(session.ledger_path(), false));
        assert!(session.ignores.is_ignored(&out.join(STATE_FILENAME), false));
        assert!(session.ignores.is_ignored(&out.join(".twinsync.ledger.4242.tmp"), false));
        assert!(!session.ignores.is_ignored(&out.join("twinsync.ledger"), false));
    }
}
