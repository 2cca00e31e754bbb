//! # twinsync-core
//!
//! Core library for keeping a canonical source tree and a generated output
//! tree synchronized in both directions.
//!
//! Source files are mapped into the output tree, read-only dependency files
//! are overlaid next to them, and edits made inside the output tree can later
//! be detected and pushed back. A small ledger file inside the output tree
//! keeps pending edits across an abnormal exit.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

/// Directory walking and ignore rules
pub mod scanner;

/// Content fingerprints, drift detection and patch previews
pub mod comparison;

/// Configuration file parsing and management
pub mod config;

/// Source specification to output path mapping
pub mod mapping;

/// Reconciliation engine, ledger and session lifecycle
pub mod sync;
