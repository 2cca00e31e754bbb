use std::path::Path;

use twinsync_core::comparison::{ChangeKind, ChangeSet, DiffGenerator};
use twinsync_core::sync::SyncReporter;

use crate::commands::CommandOptions;

pub struct Diff;

impl Diff {
    pub fn execute(options: &CommandOptions, patch: bool) -> anyhow::Result<()> {
        if options.verbose {
            println!("Executing diff command");
        }

        let session = options.attach()?;
        let changes = session.diff()?;
        print!("{}", SyncReporter::describe_changes(&changes));

        if patch {
            print_patches(&changes)?;
        }

        Ok(())
    }
}

/// Unified diff for every change, source side first
pub fn print_patches(changes: &ChangeSet) -> anyhow::Result<()> {
    for (source, change) in changes {
        let original: &Path = if change.kind == ChangeKind::New {
            Path::new("/dev/null")
        } else {
            source
        };
        println!();
        print!("{}", DiffGenerator::generate(original, &change.output)?);
    }
    Ok(())
}
