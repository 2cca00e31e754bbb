//! Interactive command loop over an open session

use anyhow::{Context, Result};
use dialoguer::Input;
use twinsync_core::sync::{Session, SyncReporter};

use crate::commands::diff::print_patches;

/// One command typed at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellCommand {
    Push,
    Pull,
    Diff { patch: bool },
    Help,
    Exit,
    ForceExit,
}

impl ShellCommand {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "push" | "p" => Some(Self::Push),
            "pull" | "l" => Some(Self::Pull),
            "diff" | "d" => Some(Self::Diff { patch: false }),
            "diff --patch" | "patch" => Some(Self::Diff { patch: true }),
            "help" | "h" | "?" => Some(Self::Help),
            "exit" | "quit" | "q" => Some(Self::Exit),
            "exit-f" | "-f" => Some(Self::ForceExit),
            _ => None,
        }
    }
}

/// Reads commands until the user exits
pub struct InteractiveShell {
    session: Session,
}

impl InteractiveShell {
    /// Create a shell over an initialized session
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Run the prompt loop
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    pub fn run(mut self) -> Result<()> {
        Self::print_help();

        loop {
            let input: String = Input::new()
                .with_prompt(format!("[{}]", self.session.config().name))
                .allow_empty(true)
                .interact_text()
                .context("Failed to read command")?;

            if input.trim().is_empty() {
                continue;
            }

            let Some(command) = ShellCommand::parse(&input) else {
                eprintln!("Unknown command '{}'. Type 'help' for the list.", input.trim());
                continue;
            };

            // A failing command is reported and the shell keeps running
            match self.dispatch(command) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => eprintln!("Error: {e:#}"),
            }
        }
    }

    /// Returns true when the shell should exit
    fn dispatch(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::Push => {
                let pushed = self.session.push()?;
                print!("{}", SyncReporter::describe_changes(&pushed));
            }
            ShellCommand::Pull => {
                let report = self.session.pull()?;
                println!("{}", SyncReporter::generate_summary("Dependencies", &report));
            }
            ShellCommand::Diff { patch } => {
                let changes = self.session.diff()?;
                print!("{}", SyncReporter::describe_changes(&changes));
                if patch {
                    print_patches(&changes)?;
                }
            }
            ShellCommand::Help => Self::print_help(),
            ShellCommand::Exit => {
                if self.session.has_pending_changes()? {
                    eprintln!(
                        "The output tree has unpushed edits; run 'push' first or use 'exit-f' to leave them in the ledger."
                    );
                } else {
                    return Ok(true);
                }
            }
            ShellCommand::ForceExit => return Ok(true),
        }
        Ok(false)
    }

    fn print_help() {
        println!("Commands:");
        println!("  push    (p)  copy edits from the output tree back to the sources");
        println!("  pull    (l)  re-copy dependencies into the output tree");
        println!("  diff    (d)  list edits in the output tree");
        println!("  patch        list edits with unified diffs");
        println!("  help    (h)  show this list");
        println!("  exit    (q)  leave, refused while edits are pending");
        println!("  exit-f  (-f) leave even with pending edits");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse(" PUSH "), Some(ShellCommand::Push));
        assert_eq!(ShellCommand::parse("l"), Some(ShellCommand::Pull));
        assert_eq!(
            ShellCommand::parse("diff --patch"),
            Some(ShellCommand::Diff { patch: true })
        );
        assert_eq!(ShellCommand::parse("exit-f"), Some(ShellCommand::ForceExit));
        assert_eq!(ShellCommand::parse("-f"), Some(ShellCommand::ForceExit));
        assert_eq!(ShellCommand::parse("exit"), Some(ShellCommand::Exit));
        assert_eq!(ShellCommand::parse("rebuild"), None);
    }
}
