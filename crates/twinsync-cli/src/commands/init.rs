use twinsync_core::sync::Session;

use crate::commands::CommandOptions;
use crate::commands::common::report_startup;

pub struct Init;

impl Init {
    pub fn execute(options: &CommandOptions) -> anyhow::Result<()> {
        if options.verbose {
            println!("Executing init command");
        }

        let (session, startup) = Session::init(options.load_config()?)?;
        report_startup(&session, &startup);
        println!("Output ready: {}", session.output().display());

        Ok(())
    }
}
