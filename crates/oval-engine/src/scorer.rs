//! # Test Scorer
//!
//! Scores one test against the items correlated for its object:
//!
//! 1. A correlation that is not TRUE is the test result; no items are
//!    recorded.
//! 2. Zero items are TRUE when `check` is `none satisfy` or
//!    `check_existence` permits an empty set, FALSE otherwise.
//! 3. Item statuses are combined by `check_existence`; anything but TRUE is
//!    the test result and every item is recorded NOT_EVALUATED.
//! 4. Without states every existing item is TRUE and the existence result
//!    stands.
//! 5. With states, each existing item's state results are combined by
//!    `state_operator` and the items by `check`.
//! 6. A TRUE result over an incomplete collection is UNKNOWN whenever the
//!    deciding quantifier would need every item. With states that is
//!    `check` (`all`, `only one`, `none satisfy`); without states only
//!    `check_existence` decides (`all_exist`, `only_one_exists`,
//!    `none_exist`).

use oval_core::{
    combine_by_check, combine_by_existence, combine_flags, Check, ExistenceCheck, Item, ItemStatus,
    ReferenceKind, ResultValue, State, Test, TestId, VariableId, VariableValue,
};

use crate::analyzer::{evaluate_state_entity, Expected};
use crate::correlator::Correlation;
use crate::error::EvaluationError;
use crate::evaluator::EvaluationPass;
use crate::results::{TestResult, TestedItem};

impl<'a> EvaluationPass<'a> {
    /// Score a test, reusing an earlier score from this pass.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::MissingReference`] when the test, its object, or
    /// one of its states is unknown, plus any cycle found while correlating
    /// or resolving variables.
    pub fn score(&mut self, id: &TestId) -> Result<TestResult, EvaluationError> {
        if let Some(cached) = self.test_cache.get(id) {
            return Ok(cached.clone());
        }
        let definitions = self.definitions;
        let test = definitions
            .test(id)
            .ok_or_else(|| EvaluationError::missing(ReferenceKind::Test, id))?;
        let states = test
            .state_refs
            .iter()
            .map(|state_ref| {
                definitions
                    .state(state_ref)
                    .ok_or_else(|| EvaluationError::missing(ReferenceKind::State, state_ref))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let correlation = self.correlate(&test.object_ref)?;
        let mut scored = TestResult::new(id.clone(), ResultValue::NotEvaluated);
        scored.result = self.score_items(test, &states, &correlation, &mut scored.tested_items)?;
        scored.tested_variables = self.tested_variables(test, &states)?;

        tracing::debug!(
            test = %id,
            result = %scored.result,
            items = scored.tested_items.len(),
            "test scored"
        );
        self.test_cache.insert(id.clone(), scored.clone());
        Ok(scored)
    }

    fn score_items(
        &mut self,
        test: &Test,
        states: &[&State],
        correlation: &Correlation<'a>,
        tested: &mut Vec<TestedItem>,
    ) -> Result<ResultValue, EvaluationError> {
        if !correlation.is_true() {
            return Ok(correlation.result);
        }
        let items = &correlation.items;
        if items.is_empty() {
            return Ok(downgrade_incomplete(test, states, correlation, zero_items(test)));
        }

        let statuses: Vec<ResultValue> = items.iter().map(|item| item.status.existence_result()).collect();
        let existence = combine_by_existence(&statuses, test.check_existence);
        if existence != ResultValue::True {
            tested.extend(items.iter().map(|item| TestedItem::new(item.id, ResultValue::NotEvaluated)));
            return Ok(existence);
        }

        if states.is_empty() {
            tested.extend(items.iter().map(|item| {
                let result = if item.status == ItemStatus::Exists {
                    ResultValue::True
                } else {
                    ResultValue::NotEvaluated
                };
                TestedItem::new(item.id, result)
            }));
            return Ok(downgrade_incomplete(test, states, correlation, existence));
        }

        let mut per_item = Vec::with_capacity(items.len());
        for item in items {
            if item.status != ItemStatus::Exists {
                tested.push(TestedItem::new(item.id, ResultValue::NotEvaluated));
                continue;
            }
            let state_results = states
                .iter()
                .map(|state| self.evaluate_state(state, item))
                .collect::<Result<Vec<_>, _>>()?;
            let result = combine_flags(&state_results, test.state_operator);
            tracing::trace!(test = %test.id, item = %item.id, %result, "item scored");
            tested.push(TestedItem::new(item.id, result));
            per_item.push(result);
        }

        let result = if per_item.is_empty() {
            zero_items(test)
        } else {
            combine_by_check(&per_item, test.check)
        };
        Ok(downgrade_incomplete(test, states, correlation, result))
    }

    /// Evaluate a state against one item. A state without entities is TRUE.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors from variables referenced by the state.
    pub(crate) fn evaluate_state(&mut self, state: &State, item: &Item) -> Result<ResultValue, EvaluationError> {
        if state.entities.is_empty() {
            return Ok(ResultValue::True);
        }
        let mut results = Vec::with_capacity(state.entities.len());
        for entity in &state.entities {
            let result = match &entity.var_ref {
                None => evaluate_state_entity(&mut self.patterns, entity, Expected::Literal, item),
                Some(var_ref) => {
                    let resolved = self.resolve_variable(var_ref)?;
                    if resolved.is_true() {
                        let expected = Expected::Values(&resolved.values);
                        evaluate_state_entity(&mut self.patterns, entity, expected, item)
                    } else {
                        resolved.flag
                    }
                }
            };
            results.push(result);
        }
        Ok(combine_flags(&results, state.operator))
    }

    /// Every variable value used by the test's object and state entities.
    fn tested_variables(&mut self, test: &Test, states: &[&State]) -> Result<Vec<VariableValue>, EvaluationError> {
        let definitions = self.definitions;
        let object = definitions
            .object(&test.object_ref)
            .ok_or_else(|| EvaluationError::missing(ReferenceKind::Object, &test.object_ref))?;

        let mut var_refs: Vec<&VariableId> = Vec::new();
        let entities = object
            .entities
            .iter()
            .chain(states.iter().flat_map(|state| state.entities.iter()));
        for var_ref in entities.filter_map(|entity| entity.var_ref.as_ref()) {
            if !var_refs.contains(&var_ref) {
                var_refs.push(var_ref);
            }
        }

        let mut values = Vec::new();
        for var_ref in var_refs {
            let resolved = self.resolve_variable(var_ref)?;
            values.extend(
                resolved
                    .values
                    .into_iter()
                    .map(|value| VariableValue::new(var_ref.clone(), value)),
            );
        }
        Ok(values)
    }
}

fn zero_items(test: &Test) -> ResultValue {
    ResultValue::from_bool(test.check == Check::NoneSatisfy || test.check_existence.permits_none())
}

fn downgrade_incomplete(
    test: &Test,
    states: &[&State],
    correlation: &Correlation<'_>,
    result: ResultValue,
) -> ResultValue {
    let needs_every_item = if states.is_empty() {
        matches!(
            test.check_existence,
            ExistenceCheck::AllExist | ExistenceCheck::OnlyOneExists | ExistenceCheck::NoneExist
        )
    } else {
        matches!(test.check, Check::All | Check::OnlyOne | Check::NoneSatisfy)
    };
    if correlation.incomplete && needs_every_item && result == ResultValue::True {
        ResultValue::Unknown
    } else {
        result
    }
}
