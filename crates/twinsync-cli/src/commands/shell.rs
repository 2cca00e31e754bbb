use twinsync_core::sync::Session;

use crate::commands::CommandOptions;
use crate::commands::common::report_startup;
use crate::interactive::InteractiveShell;

pub struct Shell;

impl Shell {
    pub fn execute(options: &CommandOptions) -> anyhow::Result<()> {
        if options.verbose {
            println!("Executing shell command");
        }

        let (session, startup) = Session::init(options.load_config()?)?;
        report_startup(&session, &startup);

        InteractiveShell::new(session).run()
    }
}
