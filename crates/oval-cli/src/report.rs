//! # Result Reports
//!
//! Renders the outcomes of an evaluation run as plain text or JSON.

use std::fmt::Write as _;

use oval_engine::{DefinitionOutcome, DefinitionResult, RunSummary};
use serde::{Deserialize, Serialize};

/// Output format of the `evaluate` subcommand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per definition plus a summary line.
    #[default]
    Text,
    /// The full result records, including criteria trees and tested items.
    Json,
}

/// One definition in a JSON report.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportEntry<'a> {
    Evaluated(&'a DefinitionResult),
    Aborted { id: String, error: String },
}

/// A JSON report.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: RunSummary,
    pub definitions: Vec<ReportEntry<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(outcomes: &'a [DefinitionOutcome]) -> Self {
        let definitions = outcomes
            .iter()
            .map(|outcome| match &outcome.outcome {
                Ok(result) => ReportEntry::Evaluated(result),
                Err(err) => ReportEntry::Aborted {
                    id: outcome.id.to_string(),
                    error: err.to_string(),
                },
            })
            .collect();
        Self {
            summary: RunSummary::tally(outcomes),
            definitions,
        }
    }
}

/// Render outcomes in the requested format.
pub fn render(outcomes: &[DefinitionOutcome], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcomes)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&Report::new(outcomes))?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_text(outcomes: &[DefinitionOutcome]) -> String {
    let mut out = String::new();
    let width = outcomes.iter().map(|o| o.id.as_str().len()).max().unwrap_or(0);
    for outcome in outcomes {
        let id = outcome.id.as_str();
        let (verdict, detail) = match &outcome.outcome {
            Ok(result) => (result.result.to_string(), result.title.clone()),
            Err(err) => ("aborted".to_string(), err.to_string()),
        };
        let line = format!("{id:<width$}  {verdict:<14} {detail}");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    let summary = RunSummary::tally(outcomes);
    let _ = writeln!(
        out,
        "\n{} definitions: {} true, {} false, {} error, {} unknown, {} not evaluated, {} not applicable, {} aborted",
        summary.definitions,
        summary.true_count,
        summary.false_count,
        summary.error_count,
        summary.unknown_count,
        summary.not_evaluated_count,
        summary.not_applicable_count,
        summary.fatal_count,
    );
    out
}
