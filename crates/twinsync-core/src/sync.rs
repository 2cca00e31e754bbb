//! Bidirectional synchronization engine
//!
//! This module implements:
//! - Idempotent reconciliation of mapping tables into the output tree
//! - The crash-recovery ledger and saved mapping tables kept inside the output tree
//! - Post-sync commands
//! - The [`Session`] that ties them together for init, pull, push and diff

mod hooks;
mod ledger;
mod reconcile;
mod reporting;
mod session;


pub use hooks::{CommandOutcome, run_after_commands};
pub use ledger::{LEDGER_FILENAME, Ledger, MappingState, RecoveryRecord, STATE_FILENAME};
pub use reconcile::{ReconcileReport, Reconciler, copy_file, remove_path};
pub use reporting::SyncReporter;
pub use session::{Session, Startup};
