//! # Evaluate Subcommand
//!
//! Evaluates definitions against a system-characteristics document.
//!
//! ```bash
//! oval evaluate --definitions defs.json --characteristics host.json
//! oval evaluate --definitions defs.json --characteristics host.json \
//!     --variables vars.json --definition oval:org.example:def:1 --format json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use oval_core::DefinitionId;
use oval_engine::{EvaluationOptions, Evaluator, RunSummary};

use crate::config::CliConfig;
use crate::documents::{load_characteristics, load_definitions, load_variables};
use crate::report::{render, OutputFormat};
use crate::{EXIT_FAILED, EXIT_OK};

/// Arguments for the evaluate subcommand.
#[derive(Args, Debug, Default)]
pub struct EvaluateArgs {
    /// Definitions document (JSON).
    #[arg(long)]
    pub definitions: Option<PathBuf>,

    /// System-characteristics document (JSON).
    #[arg(long)]
    pub characteristics: Option<PathBuf>,

    /// External variable values (JSON object of id to value list).
    #[arg(long)]
    pub variables: Option<PathBuf>,

    /// Evaluate only these definitions. Repeatable.
    #[arg(long = "definition", value_name = "ID")]
    pub definition_ids: Vec<String>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Reference time for time differences (RFC 3339); defaults to now.
    #[arg(long)]
    pub reference_time: Option<DateTime<Utc>>,
}

/// Execute the evaluate subcommand.
pub fn run_evaluate(args: &EvaluateArgs, config: &CliConfig) -> Result<u8> {
    let definitions_path = required(args.definitions.as_deref(), config.definitions.as_deref(), "--definitions")?;
    let characteristics_path = required(
        args.characteristics.as_deref(),
        config.characteristics.as_deref(),
        "--characteristics",
    )?;
    let variables_path = args.variables.as_deref().or(config.variables.as_deref());

    let definitions = load_definitions(definitions_path)?;
    let store = load_characteristics(characteristics_path)?;
    let externals = load_variables(variables_path)?;

    let options = EvaluationOptions {
        reference_time: args.reference_time.or(config.reference_time),
    };
    let evaluator = Evaluator::new(&definitions, &store, &externals).with_options(options);

    let selected = if args.definition_ids.is_empty() {
        &config.definition_ids
    } else {
        &args.definition_ids
    };
    let outcomes = if selected.is_empty() {
        evaluator.evaluate_all()
    } else {
        let ids = selected
            .iter()
            .map(|id| DefinitionId::new(id.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .context("invalid --definition identifier")?;
        evaluator.evaluate_selected(&ids)
    };

    let format = args.format.or(config.format).unwrap_or_default();
    let rendered = render(&outcomes, format).context("failed to render report")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write report: {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }

    let summary = RunSummary::tally(&outcomes);
    if summary.fatal_count > 0 {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_OK)
    }
}

fn required<'p>(flag: Option<&'p Path>, configured: Option<&'p Path>, name: &str) -> Result<&'p Path> {
    flag.or(configured)
        .with_context(|| format!("{name} is required (on the command line or in the config file)"))
}
