//! Human-readable summaries of sync passes

use std::fmt::Write;

use super::hooks::CommandOutcome;
use super::reconcile::ReconcileReport;
use crate::comparison::{ChangeKind, ChangeSet};

/// Sync operation reporter
pub struct SyncReporter;

impl SyncReporter {
    /// Summary block for one reconcile pass
    #[must_use]
    pub fn generate_summary(label: &str, report: &ReconcileReport) -> String {
        let mut output = String::new();

        writeln!(output, "=== {label} ===")
            .expect("Writing to String should never fail");
        writeln!(output, "Copied:    {}", report.copied)
            .expect("Writing to String should never fail");
        writeln!(output, "Replaced:  {}", report.replaced)
            .expect("Writing to String should never fail");
        writeln!(output, "Unchanged: {}", report.unchanged)
            .expect("Writing to String should never fail");
        if report.stale > 0 {
            writeln!(output, "Stale:     {}", report.stale)
                .expect("Writing to String should never fail");
        }
        if report.cleared > 0 {
            writeln!(output, "Cleared:   {}", report.cleared)
                .expect("Writing to String should never fail");
        }
        writeln!(output, "Total writes: {}", report.total_writes())
            .expect("Writing to String should never fail");

        output
    }

    /// One tagged line per change, `[kind] source @ output`
    #[must_use]
    pub fn describe_changes(changes: &ChangeSet) -> String {
        if changes.is_empty() {
            return "No changes.\n".to_string();
        }

        let mut output = String::new();
        for (source, change) in changes {
            writeln!(
                output,
                "[{}] {} @ {}",
                change.kind,
                source.display(),
                change.output.display()
            )
            .expect("Writing to String should never fail");
        }
        writeln!(
            output,
            "{} new, {} changed, {} deleted",
            changes.count(ChangeKind::New),
            changes.count(ChangeKind::Changed),
            changes.count(ChangeKind::Deleted)
        )
        .expect("Writing to String should never fail");

        output
    }

    /// Status line per post-sync command, with stderr of failures
    #[must_use]
    pub fn describe_commands(outcomes: &[CommandOutcome]) -> String {
        let mut output = String::new();
        for outcome in outcomes {
            if outcome.success {
                writeln!(output, "✓ {}", outcome.command)
                    .expect("Writing to String should never fail");
            } else {
                let code = outcome
                    .exit_code
                    .map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"));
                writeln!(output, "✗ {} ({code})", outcome.command)
                    .expect("Writing to String should never fail");
                for line in outcome.stderr.lines() {
                    writeln!(output, "    {line}")
                        .expect("Writing to String should never fail");
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let report = ReconcileReport {
            copied: 5,
            replaced: 3,
            unchanged: 2,
            ..ReconcileReport::default()
        };

        let summary = SyncReporter::generate_summary("Sources", &report);
        assert!(summary.starts_with("=== Sources ==="));
        assert!(summary.contains("Copied:    5"));
        assert!(summary.contains("Replaced:  3"));
        assert!(summary.contains("Total writes: 8"));
        assert!(!summary.contains("Stale"));
    }

    #[test]
    fn test_describe_changes() {
        let changes: ChangeSet = serde_json::from_str(
            r#"{
                "/src/a": {"kind": "changed", "output": "/out/a", "hash": "h"},
                "/src/b": {"kind": "new", "output": "/out/b"}
            }"#,
        )
        .unwrap();

        let listing = SyncReporter::describe_changes(&changes);
        assert!(listing.contains("[changed] /src/a @ /out/a"));
        assert!(listing.contains("[new] /src/b @ /out/b"));
        assert!(listing.contains("1 new, 1 changed, 0 deleted"));
        assert_eq!(SyncReporter::describe_changes(&ChangeSet::new()), "No changes.\n");
    }

    #[test]
    fn test_describe_failed_command() {
        let outcomes = vec![CommandOutcome {
            command: "make".to_string(),
            success: false,
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "no rule\n".to_string(),
        }];

        let text = SyncReporter::describe_commands(&outcomes);
        assert!(text.contains("✗ make (exit code 2)"));
        assert!(text.contains("    no rule"));
    }
}
