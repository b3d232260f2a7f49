//! # oval-cli — OVAL Evaluator Command-Line Interface
//!
//! Loads JSON definition, system-characteristics, and external-variable
//! documents, runs an evaluation pass, and reports the results.
//!
//! ## Subcommands
//!
//! - `evaluate` — Evaluate all (or selected) definitions
//! - `validate` — Check a definitions document for dangling references
//!
//! ## Exit codes
//!
//! | code | meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | every requested definition was evaluated                  |
//! | 1    | a definition aborted, or the document failed validation   |
//! | 2    | operational error (unreadable file, malformed config)     |
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers return `anyhow::Result<u8>`.
//! - Evaluation semantics live in `oval-engine`; nothing here decides a
//!   result.

pub mod config;
pub mod documents;
pub mod evaluate;
pub mod report;
pub mod validate;

/// Exit code for a clean run.
pub const EXIT_OK: u8 = 0;
/// Exit code when definitions aborted or failed validation.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for operational errors.
pub const EXIT_ERROR: u8 = 2;
