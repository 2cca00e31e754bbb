use twinsync_core::sync::SyncReporter;

use crate::commands::CommandOptions;

pub struct Push;

impl Push {
    pub fn execute(options: &CommandOptions) -> anyhow::Result<()> {
        if options.verbose {
            println!("Executing push command");
        }

        let mut session = options.attach()?;
        let pushed = session.push()?;
        if pushed.is_empty() {
            println!("Nothing to push.");
        } else {
            print!("{}", SyncReporter::describe_changes(&pushed));
            println!("Pushed {} change(s).", pushed.len());
        }

        Ok(())
    }
}
