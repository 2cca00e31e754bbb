//! Post-sync shell commands run inside the output directory

use std::path::Path;
use std::process::Command;

/// Result of one post-sync command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Command line as configured
    pub command: String,
    /// Exited with status zero
    pub success: bool,
    /// Exit code, absent when killed by a signal or never started
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr, or the spawn error
    pub stderr: String,
}

/// Run `commands` one after another with `cwd` as working directory
///
/// A failing command is reported in its outcome and does not stop the ones
/// after it.
#[must_use]
pub fn run_after_commands(commands: &[String], cwd: &Path) -> Vec<CommandOutcome> {
    commands
        .iter()
        .map(|command| {
            let outcome = run_command(command, cwd);
            if outcome.success {
                tracing::info!(command = %command, "Post-sync command finished");
            } else {
                tracing::warn!(
                    command = %command,
                    exit_code = ?outcome.exit_code,
                    stderr = %outcome.stderr.trim(),
                    "Post-sync command failed"
                );
            }
            outcome
        })
        .collect()
}

fn run_command(command: &str, cwd: &Path) -> CommandOutcome {
    tracing::debug!(command = %command, cwd = %cwd.display(), "Running post-sync command");

    match shell(command).current_dir(cwd).output() {
        Ok(output) => CommandOutcome {
            command: command.to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Err(e) => CommandOutcome {
            command: command.to_string(),
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("Failed to start command: {e}"),
        },
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
