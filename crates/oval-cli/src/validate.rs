//! # Validate Subcommand
//!
//! Checks a definitions document without evaluating it: the document must
//! parse, identifiers must be unique, and every reference must resolve.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use oval_core::DanglingReference;

use crate::config::CliConfig;
use crate::documents::load_definitions;
use crate::{EXIT_FAILED, EXIT_OK};

/// Arguments for the validate subcommand.
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Definitions document (JSON). Falls back to the config file.
    pub definitions: Option<PathBuf>,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, config: &CliConfig) -> Result<u8> {
    let path = args
        .definitions
        .as_deref()
        .or(config.definitions.as_deref())
        .context("a definitions document is required (argument or config file)")?;
    let problems = validate_definitions(path)?;
    if problems.is_empty() {
        println!("{}: ok", path.display());
        return Ok(EXIT_OK);
    }
    for problem in &problems {
        println!("{}: {problem}", path.display());
    }
    println!("{} problem(s) found", problems.len());
    Ok(EXIT_FAILED)
}

/// Validate a definitions document, returning one message per problem.
///
/// An unreadable file is an error; a file that is readable but invalid
/// yields problems.
pub fn validate_definitions(path: &Path) -> Result<Vec<String>> {
    std::fs::metadata(path).with_context(|| format!("failed to read definitions: {}", path.display()))?;
    let definitions = match load_definitions(path) {
        Ok(definitions) => definitions,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "definitions failed to load");
            return Ok(vec![format!("{:#}", err.root_cause())]);
        }
    };
    let dangling: Vec<DanglingReference> = definitions.validate_references();
    for reference in &dangling {
        tracing::warn!(from = %reference.from, kind = %reference.kind, id = %reference.id, "dangling reference");
    }
    Ok(dangling.iter().map(ToString::to_string).collect())
}
