//! # Result Records
//!
//! What an evaluation pass produces: one [`DefinitionResult`] per requested
//! definition, carrying the evaluated criteria tree and every test reached
//! from it (including through extended definitions), each with the items
//! and variable values it examined.
//!
//! Records are created fresh per pass and are plain serde data, so callers
//! can render them in any format.

use std::collections::BTreeMap;

use oval_core::{
    DefinitionClass, DefinitionId, ItemId, Operator, ResultCounts, ResultValue, TestId,
    VariableValue,
};
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

/// The per-item outcome of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestedItem {
    pub item_id: ItemId,
    pub result: ResultValue,
}

impl TestedItem {
    pub fn new(item_id: ItemId, result: ResultValue) -> Self {
        Self { item_id, result }
    }
}

/// The outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: TestId,
    pub result: ResultValue,
    /// Items correlated for the test's object, in correlation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tested_items: Vec<TestedItem>,
    /// Variable values used by the test's object and state entities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tested_variables: Vec<VariableValue>,
}

impl TestResult {
    pub fn new(test_id: TestId, result: ResultValue) -> Self {
        Self {
            test_id,
            result,
            tested_items: Vec::new(),
            tested_variables: Vec::new(),
        }
    }
}

/// An evaluated criteria tree node. `result` already includes the node's
/// own negation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriteriaResult {
    Criteria {
        operator: Operator,
        negate: bool,
        result: ResultValue,
        children: Vec<CriteriaResult>,
    },
    Criterion {
        test_ref: TestId,
        negate: bool,
        result: ResultValue,
    },
    ExtendDefinition {
        definition_ref: DefinitionId,
        negate: bool,
        result: ResultValue,
    },
}

impl CriteriaResult {
    pub fn result(&self) -> ResultValue {
        match self {
            Self::Criteria { result, .. }
            | Self::Criterion { result, .. }
            | Self::ExtendDefinition { result, .. } => *result,
        }
    }
}

/// The outcome of one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionResult {
    pub id: DefinitionId,
    pub class: DefinitionClass,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub result: ResultValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<CriteriaResult>,
    /// Every test reached from the criteria tree, transitively.
    #[serde(default)]
    pub tests: BTreeMap<TestId, TestResult>,
}

/// One entry of a multi-definition run: either a result or the fatal error
/// that aborted that definition.
#[derive(Debug, Clone)]
pub struct DefinitionOutcome {
    pub id: DefinitionId,
    pub outcome: Result<DefinitionResult, EvaluationError>,
}

impl DefinitionOutcome {
    /// The definition result, or `None` when evaluation aborted.
    pub fn result(&self) -> Option<ResultValue> {
        self.outcome.as_ref().ok().map(|r| r.result)
    }
}

/// Tally of definition results across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub definitions: usize,
    pub true_count: usize,
    pub false_count: usize,
    pub error_count: usize,
    pub unknown_count: usize,
    pub not_evaluated_count: usize,
    pub not_applicable_count: usize,
    /// Definitions aborted by a fatal evaluation error.
    pub fatal_count: usize,
}

impl RunSummary {
    pub fn tally(outcomes: &[DefinitionOutcome]) -> Self {
        let results: Vec<ResultValue> = outcomes.iter().filter_map(DefinitionOutcome::result).collect();
        let counts = ResultCounts::tally(&results);
        Self {
            definitions: outcomes.len(),
            true_count: counts.true_count,
            false_count: counts.false_count,
            error_count: counts.error_count,
            unknown_count: counts.unknown_count,
            not_evaluated_count: counts.not_evaluated_count,
            not_applicable_count: counts.not_applicable_count,
            fatal_count: outcomes.len() - results.len(),
        }
    }
}
