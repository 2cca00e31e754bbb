//! Crash-recovery record and mapping state kept inside the output directory

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::reconcile::{remove_path, set_readonly};
use crate::comparison::ChangeSet;
use crate::error::Result;
use crate::mapping::Mapper;

/// Sentinel file name inside the output directory
pub const LEDGER_FILENAME: &str = ".twinsync.ledger";

/// Mapping tables saved after every completed sync
pub const STATE_FILENAME: &str = ".twinsync.state";

/// Snapshot of both mapping tables and the pending changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecoveryRecord {
    /// Source mapping table
    pub source: Mapper,
    /// Dependency mapping table
    pub dependencies: Mapper,
    /// Drift found by the last diff
    pub changes: ChangeSet,
}

/// Both mapping tables as of the last init, pull or push
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MappingState {
    /// Source mapping table
    pub source: Mapper,
    /// Dependency mapping table
    pub dependencies: Mapper,
}

#[derive(Serialize)]
struct StateRef<'a> {
    source: &'a Mapper,
    dependencies: &'a Mapper,
}

#[derive(Serialize)]
struct RecordRef<'a> {
    source: &'a Mapper,
    dependencies: &'a Mapper,
    changes: &'a ChangeSet,
}

/// Reads and writes the recovery sentinel and the mapping state
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    state: PathBuf,
}

impl Ledger {
    /// Ledger for the output tree at `output_root`
    #[must_use]
    pub fn new(output_root: &Path) -> Self {
        Self {
            path: output_root.join(LEDGER_FILENAME),
            state: output_root.join(STATE_FILENAME),
        }
    }

    /// Location of the sentinel file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the mapping state file
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state
    }

    /// Replace the sentinel with the given state
    ///
    /// Any existing sentinel is removed first. A new one is only written
    /// when `changes` is non-empty; it is left read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the old sentinel cannot be removed or the new one
    /// cannot be written.
    pub fn persist(&self, source: &Mapper, dependencies: &Mapper, changes: &ChangeSet) -> Result<()> {
        remove_path(&self.path)?;

        if changes.is_empty() {
            tracing::debug!(path = %self.path.display(), "No pending changes; ledger cleared");
            return Ok(());
        }

        let record = RecordRef {
            source,
            dependencies,
            changes,
        };
        let content = serde_json::to_vec(&record).context("Failed to serialize recovery record")?;
        write_atomic(&self.path, &content)?;
        set_readonly(&self.path, true)?;

        tracing::debug!(
            path = %self.path.display(),
            changes = changes.len(),
            "Recovery record written"
        );
        Ok(())
    }

    /// Read the sentinel if a usable one exists
    ///
    /// A sentinel that is not a regular file or fails to parse is logged and
    /// ignored.
    #[must_use]
    pub fn restore(&self) -> Option<RecoveryRecord> {
        let metadata = fs::symlink_metadata(&self.path).ok()?;
        if !metadata.is_file() {
            tracing::warn!(path = %self.path.display(), "Ledger path is not a file; ignoring it");
            return None;
        }

        let parsed = fs::read(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<RecoveryRecord>(&bytes)?));

        match parsed {
            Ok(record) => {
                tracing::info!(
                    path = %self.path.display(),
                    changes = record.changes.len(),
                    "Recovered pending changes from ledger"
                );
                Some(record)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable ledger; rescanning");
                None
            }
        }
    }

    /// Save both tables so a later session can adopt them
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be replaced.
    pub fn save_state(&self, source: &Mapper, dependencies: &Mapper) -> Result<()> {
        let state = StateRef {
            source,
            dependencies,
        };
        let content = serde_json::to_vec(&state).context("Failed to serialize mapping state")?;

        remove_path(&self.state)?;
        write_atomic(&self.state, &content)?;
        set_readonly(&self.state, true)?;

        tracing::debug!(
            path = %self.state.display(),
            sources = source.len(),
            dependencies = dependencies.len(),
            "Mapping state saved"
        );
        Ok(())
    }

    /// Read the saved tables, if any
    ///
    /// A state file that is missing or fails to parse yields `None`; the
    /// latter is logged.
    #[must_use]
    pub fn load_state(&self) -> Option<MappingState> {
        let metadata = fs::symlink_metadata(&self.state).ok()?;
        if !metadata.is_file() {
            tracing::warn!(path = %self.state.display(), "State path is not a file; ignoring it");
            return None;
        }

        let parsed = fs::read(&self.state)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<MappingState>(&bytes)?));

        match parsed {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(path = %self.state.display(), error = %e, "Unreadable mapping state");
                None
            }
        }
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
    let temp_path = path.with_file_name(format!("{file_name}.{}.tmp", std::process::id()));

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create {}", temp_path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush {}", temp_path.display()))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ChangeKind;
    use crate::mapping::MappingEntry;
    use tempfile::TempDir;

    fn sample() -> (Mapper, Mapper, ChangeSet) {
        let source: Mapper = [(
            PathBuf::from("/src/a"),
            MappingEntry {
                hash: "abc".to_string(),
                output: PathBuf::from("/out/a"),
                readonly: false,
            },
        )]
        .into_iter()
        .collect();

        let changes: ChangeSet = serde_json::from_str(
            r#"{"/src/a": {"kind": "changed", "output": "/out/a", "hash": "abc"}}"#,
        )
        .unwrap();

        (source, Mapper::new(), changes)
    }

    #[test]
    fn test_persist_and_restore() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        let (source, deps, changes) = sample();

        ledger.persist(&source, &deps, &changes).unwrap();
        assert!(fs::metadata(ledger.path()).unwrap().permissions().readonly());

        let record = ledger.restore().unwrap();
        assert_eq!(record.source, source);
        assert_eq!(record.changes, changes);
        assert_eq!(
            record.changes.get(Path::new("/src/a")).unwrap().kind,
            ChangeKind::Changed
        );
    }

    #[test]
    fn test_persist_empty_clears_sentinel() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        let (source, deps, changes) = sample();

        ledger.persist(&source, &deps, &changes).unwrap();
        ledger.persist(&source, &deps, &ChangeSet::new()).unwrap();

        assert!(!ledger.path().exists());
        assert!(ledger.restore().is_none());
    }

    #[test]
    fn test_restore_ignores_garbage() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        fs::write(ledger.path(), "not json").unwrap();

        assert!(ledger.restore().is_none());
    }

    #[test]
    fn test_directory_sentinel_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        fs::create_dir_all(ledger.path().join("junk")).unwrap();
        assert!(ledger.restore().is_none());

        let (source, deps, changes) = sample();
        ledger.persist(&source, &deps, &changes).unwrap();
        assert!(ledger.path().is_file());
    }

    #[test]
    fn test_save_and_load_state() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        assert!(ledger.load_state().is_none());

        let (source, deps, _) = sample();
        ledger.save_state(&source, &deps).unwrap();
        ledger.save_state(&source, &deps).unwrap();

        let state = ledger.load_state().unwrap();
        assert_eq!(state.source, source);
        assert!(state.dependencies.is_empty());
        assert!(!ledger.path().exists());
    }

    #[test]
    fn test_unreadable_state_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        fs::write(ledger.state_path(), "[1, 2").unwrap();

        assert!(ledger.load_state().is_none());
    }

    #[test]
    fn test_record_shape() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path());
        let (source, deps, changes) = sample();
        ledger.persist(&source, &deps, &changes).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(ledger.path()).unwrap()).unwrap();
        assert_eq!(value["source"]["/src/a"]["hash"], "abc");
        assert!(value["dependencies"].as_object().unwrap().is_empty());
        assert_eq!(value["changes"]["/src/a"]["output"], "/out/a");
    }
}
