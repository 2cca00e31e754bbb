use twinsync_core::sync::SyncReporter;

use crate::commands::CommandOptions;

pub struct Pull;

impl Pull {
    pub fn execute(options: &CommandOptions) -> anyhow::Result<()> {
        if options.verbose {
            println!("Executing pull command");
        }

        let mut session = options.attach()?;
        let report = session.pull()?;
        println!("{}", SyncReporter::generate_summary("Dependencies", &report));

        Ok(())
    }
}
