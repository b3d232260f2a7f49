//! # Criteria Evaluator
//!
//! Entry point of the engine. An [`Evaluator`] borrows the read-only inputs
//! (definitions, collected facts, external variable values) and hands out
//! [`EvaluationPass`]es. A pass owns every per-pass cache and is driven
//! through `&mut self`, so no locking is involved; independent evaluators
//! over shared inputs can run on separate threads.
//!
//! ## Criteria semantics
//!
//! - Criterion ⇒ the referenced test's result.
//! - Extend definition ⇒ the referenced definition's result.
//! - Criteria ⇒ `combine_flags(children, operator)`.
//! - Every node applies its own `negate` after computing its result.
//! - A definition without criteria is NOT_EVALUATED.
//!
//! Definition, test, correlation, and variable results are memoized per
//! identifier within a pass, as are compiled `pattern match` expressions. A definition revisited while still on the
//! active path is a [`EvaluationError::CyclicDefinition`]; fatal errors
//! abort only the top-level definition being evaluated.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use oval_core::{
    combine_flags, Criteria, CriteriaNode, DefinitionId, DefinitionSet, ExternalVariables,
    ObjectId, ReferenceKind, ResultValue, SystemCharacteristics, TestId, VariableId,
};

use crate::comparator::PatternCache;
use crate::correlator::Correlation;
use crate::error::EvaluationError;
use crate::results::{CriteriaResult, DefinitionOutcome, DefinitionResult, RunSummary, TestResult};
use crate::variable::ResolvedValues;

/// Tunables of an evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// "Now" for single-operand time differences; the wall clock at pass
    /// creation when unset.
    pub reference_time: Option<DateTime<Utc>>,
}

/// Borrowed inputs of an evaluation run.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    definitions: &'a DefinitionSet,
    store: &'a SystemCharacteristics,
    externals: &'a ExternalVariables,
    options: EvaluationOptions,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        definitions: &'a DefinitionSet,
        store: &'a SystemCharacteristics,
        externals: &'a ExternalVariables,
    ) -> Self {
        Self {
            definitions,
            store,
            externals,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    /// Start a pass with empty caches.
    pub fn pass(&self) -> EvaluationPass<'a> {
        EvaluationPass {
            definitions: self.definitions,
            store: self.store,
            externals: self.externals,
            reference_time: self.options.reference_time.unwrap_or_else(Utc::now),
            definition_cache: HashMap::new(),
            test_cache: HashMap::new(),
            correlation_cache: HashMap::new(),
            variable_cache: HashMap::new(),
            component_cache: HashMap::new(),
            active_definitions: HashSet::new(),
            active_variables: HashSet::new(),
            active_objects: HashSet::new(),
            patterns: PatternCache::new(),
        }
    }

    /// Evaluate a single definition in a fresh pass.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] for cycles and dangling references.
    pub fn evaluate(&self, id: &DefinitionId) -> Result<DefinitionResult, EvaluationError> {
        self.pass().evaluate_definition(id)
    }

    /// Evaluate every definition in identifier order within one pass.
    pub fn evaluate_all(&self) -> Vec<DefinitionOutcome> {
        let ids: Vec<DefinitionId> = self.definitions.definitions().map(|d| d.id.clone()).collect();
        self.evaluate_selected(&ids)
    }

    /// Evaluate the given definitions, in the given order, within one pass.
    pub fn evaluate_selected(&self, ids: &[DefinitionId]) -> Vec<DefinitionOutcome> {
        let mut pass = self.pass();
        let outcomes: Vec<DefinitionOutcome> = ids
            .iter()
            .map(|id| {
                let outcome = pass.evaluate_definition(id);
                if let Err(err) = &outcome {
                    tracing::warn!(definition = %id, error = %err, "definition aborted");
                }
                DefinitionOutcome {
                    id: id.clone(),
                    outcome,
                }
            })
            .collect();
        let summary = RunSummary::tally(&outcomes);
        tracing::info!(
            definitions = summary.definitions,
            true_count = summary.true_count,
            false_count = summary.false_count,
            error_count = summary.error_count,
            unknown_count = summary.unknown_count,
            fatal = summary.fatal_count,
            "evaluation finished"
        );
        outcomes
    }
}

/// Key of the object-component cache: object, item field, record field.
pub(crate) type ComponentKey = (ObjectId, String, Option<String>);

/// One evaluation pass: borrowed inputs plus per-pass caches.
///
/// The resolver, correlator, and scorer are implemented as further
/// `impl` blocks on this type in their own modules.
#[derive(Debug)]
pub struct EvaluationPass<'a> {
    pub(crate) definitions: &'a DefinitionSet,
    pub(crate) store: &'a SystemCharacteristics,
    pub(crate) externals: &'a ExternalVariables,
    pub(crate) reference_time: DateTime<Utc>,
    pub(crate) definition_cache: HashMap<DefinitionId, DefinitionResult>,
    pub(crate) test_cache: HashMap<TestId, TestResult>,
    pub(crate) correlation_cache: HashMap<ObjectId, Correlation<'a>>,
    pub(crate) variable_cache: HashMap<VariableId, ResolvedValues>,
    pub(crate) component_cache: HashMap<ComponentKey, ResolvedValues>,
    pub(crate) active_definitions: HashSet<DefinitionId>,
    pub(crate) active_variables: HashSet<VariableId>,
    pub(crate) active_objects: HashSet<ObjectId>,
    pub(crate) patterns: PatternCache,
}

impl<'a> EvaluationPass<'a> {
    /// Evaluate one definition, reusing any result already computed in
    /// this pass.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::CyclicDefinition`] for a definition that extends
    ///   itself.
    /// - [`EvaluationError::MissingReference`] for dangling references.
    /// - Cycle errors raised while resolving variables or objects.
    pub fn evaluate_definition(&mut self, id: &DefinitionId) -> Result<DefinitionResult, EvaluationError> {
        if let Some(cached) = self.definition_cache.get(id) {
            return Ok(cached.clone());
        }
        let definitions = self.definitions;
        let definition = definitions
            .definition(id)
            .ok_or_else(|| EvaluationError::missing(ReferenceKind::Definition, id))?;
        if !self.active_definitions.insert(id.clone()) {
            return Err(EvaluationError::CyclicDefinition(id.clone()));
        }

        let mut tests = BTreeMap::new();
        let outcome = match &definition.criteria {
            Some(criteria) => self.evaluate_criteria(criteria, &mut tests).map(Some),
            None => Ok(None),
        };
        self.active_definitions.remove(id);
        let criteria = outcome?;

        let result = criteria
            .as_ref()
            .map_or(ResultValue::NotEvaluated, CriteriaResult::result);
        tracing::debug!(definition = %id, %result, tests = tests.len(), "definition evaluated");

        let evaluated = DefinitionResult {
            id: id.clone(),
            class: definition.class,
            title: definition.title.clone(),
            result,
            criteria,
            tests,
        };
        self.definition_cache.insert(id.clone(), evaluated.clone());
        Ok(evaluated)
    }

    fn evaluate_criteria(
        &mut self,
        criteria: &'a Criteria,
        tests: &mut BTreeMap<TestId, TestResult>,
    ) -> Result<CriteriaResult, EvaluationError> {
        let children = criteria
            .children
            .iter()
            .map(|child| self.evaluate_node(child, tests))
            .collect::<Result<Vec<_>, _>>()?;
        let results: Vec<ResultValue> = children.iter().map(CriteriaResult::result).collect();
        let result = combine_flags(&results, criteria.operator).negate_if(criteria.negate);
        Ok(CriteriaResult::Criteria {
            operator: criteria.operator,
            negate: criteria.negate,
            result,
            children,
        })
    }

    fn evaluate_node(
        &mut self,
        node: &'a CriteriaNode,
        tests: &mut BTreeMap<TestId, TestResult>,
    ) -> Result<CriteriaResult, EvaluationError> {
        match node {
            CriteriaNode::Criteria(criteria) => self.evaluate_criteria(criteria, tests),
            CriteriaNode::Criterion(criterion) => {
                let scored = self.score(&criterion.test_ref)?;
                let result = scored.result.negate_if(criterion.negate);
                tests.insert(scored.test_id.clone(), scored);
                Ok(CriteriaResult::Criterion {
                    test_ref: criterion.test_ref.clone(),
                    negate: criterion.negate,
                    result,
                })
            }
            CriteriaNode::ExtendDefinition(extend) => {
                let extended = self.evaluate_definition(&extend.definition_ref)?;
                tests.extend(extended.tests);
                Ok(CriteriaResult::ExtendDefinition {
                    definition_ref: extend.definition_ref.clone(),
                    negate: extend.negate,
                    result: extended.result.negate_if(extend.negate),
                })
            }
        }
    }
}
