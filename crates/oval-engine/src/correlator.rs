//! # Object/Item Correlator
//!
//! Maps an object to the items it selects on the assessed system.
//!
//! ## Collected objects
//!
//! | store flag        | correlation                         |
//! |-------------------|-------------------------------------|
//! | absent            | UNKNOWN                             |
//! | `not collected`   | UNKNOWN                             |
//! | `error`           | ERROR                               |
//! | `not applicable`  | NOT_APPLICABLE                      |
//! | `does not exist`  | TRUE, no items                      |
//! | `complete`        | TRUE, the collected items           |
//! | `incomplete`      | TRUE, the collected items, flagged  |
//!
//! Object entities backed by a variable re-filter the collected items: an
//! item is admitted when its same-named entities, each matched against any
//! of the variable's values, satisfy the entity's `existence_check`.
//!
//! ## Set objects
//!
//! A set object combines the correlations of one or two referenced objects
//! by item identity. Filters then include or exclude items whose state
//! evaluates TRUE. Correlations are memoized per object for the pass.

use oval_core::{
    combine_flags, CollectedFlag, Filter, FilterAction, Item, ItemId, Object, ObjectId,
    ObjectSet, Operator, ReferenceKind, ResultValue, SetOperator,
};

use crate::analyzer::{admit_item, Expected};
use crate::error::EvaluationError;
use crate::evaluator::EvaluationPass;

/// The items an object selects, with the quality of that selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation<'a> {
    /// Selected items in store order; always empty unless `result` is TRUE.
    pub items: Vec<&'a Item>,
    pub result: ResultValue,
    /// The store reported the object as only partially collected.
    pub incomplete: bool,
}

impl<'a> Correlation<'a> {
    fn found(items: Vec<&'a Item>) -> Self {
        Self {
            items,
            result: ResultValue::True,
            incomplete: false,
        }
    }

    fn flagged(result: ResultValue) -> Self {
        Self {
            items: Vec::new(),
            result,
            incomplete: false,
        }
    }

    pub fn is_true(&self) -> bool {
        self.result == ResultValue::True
    }
}

impl<'a> EvaluationPass<'a> {
    /// Correlate an object, reusing an earlier correlation from this pass.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::CyclicObject`] when a set object, filter, or
    /// object component leads back to the object being correlated;
    /// [`EvaluationError::MissingReference`] for unknown objects or states.
    pub fn correlate(&mut self, id: &ObjectId) -> Result<Correlation<'a>, EvaluationError> {
        if let Some(cached) = self.correlation_cache.get(id) {
            return Ok(cached.clone());
        }
        let definitions = self.definitions;
        let object = definitions
            .object(id)
            .ok_or_else(|| EvaluationError::missing(ReferenceKind::Object, id))?;
        if !self.active_objects.insert(id.clone()) {
            return Err(EvaluationError::CyclicObject(id.clone()));
        }
        let outcome = self.correlate_object(object);
        self.active_objects.remove(id);
        let correlation = outcome?;

        tracing::debug!(
            object = %id,
            items = correlation.items.len(),
            result = %correlation.result,
            incomplete = correlation.incomplete,
            "object correlated"
        );
        self.correlation_cache.insert(id.clone(), correlation.clone());
        Ok(correlation)
    }

    fn correlate_object(&mut self, object: &'a Object) -> Result<Correlation<'a>, EvaluationError> {
        let mut correlation = match &object.set {
            Some(set) => self.correlate_set(&object.id, set)?,
            None => {
                let collected = self.collected_items(&object.id);
                self.admit_variable_entities(object, collected)?
            }
        };
        if correlation.is_true() && !object.filters.is_empty() {
            self.apply_filters(&object.filters, &mut correlation)?;
        }
        Ok(correlation)
    }

    fn collected_items(&self, id: &ObjectId) -> Correlation<'a> {
        let store = self.store;
        let Some(collected) = store.collected_object(id) else {
            tracing::debug!(object = %id, "object absent from system characteristics");
            return Correlation::flagged(ResultValue::Unknown);
        };
        match collected.flag {
            CollectedFlag::NotCollected => Correlation::flagged(ResultValue::Unknown),
            CollectedFlag::Error => Correlation::flagged(ResultValue::Error),
            CollectedFlag::NotApplicable => Correlation::flagged(ResultValue::NotApplicable),
            CollectedFlag::DoesNotExist => Correlation::found(Vec::new()),
            CollectedFlag::Complete | CollectedFlag::Incomplete => {
                let mut items = Vec::with_capacity(collected.item_refs.len());
                for item_ref in &collected.item_refs {
                    match store.item(*item_ref) {
                        Some(item) => items.push(item),
                        None => {
                            tracing::warn!(
                                object = %id,
                                item = %item_ref,
                                "collected object references a missing item"
                            );
                            return Correlation::flagged(ResultValue::Error);
                        }
                    }
                }
                let mut correlation = Correlation::found(items);
                correlation.incomplete = collected.flag == CollectedFlag::Incomplete;
                correlation
            }
        }
    }

    /// Re-filter collected items by the object's variable-backed entities.
    fn admit_variable_entities(
        &mut self,
        object: &'a Object,
        mut correlation: Correlation<'a>,
    ) -> Result<Correlation<'a>, EvaluationError> {
        for entity in &object.entities {
            if !correlation.is_true() {
                break;
            }
            let Some(var_ref) = &entity.var_ref else {
                continue;
            };
            let resolved = self.resolve_variable(var_ref)?;
            if !resolved.is_true() {
                return Ok(Correlation::flagged(resolved.flag));
            }

            let mut rejected = Vec::new();
            let patterns = &mut self.patterns;
            correlation.items.retain(|item| {
                match admit_item(patterns, entity, Expected::Values(&resolved.values), item) {
                    ResultValue::True => true,
                    ResultValue::False | ResultValue::NotApplicable => false,
                    other => {
                        rejected.push(other);
                        false
                    }
                }
            });
            if !rejected.is_empty() {
                rejected.push(correlation.result);
                let result = combine_flags(&rejected, Operator::And);
                tracing::debug!(object = %object.id, entity = %entity.name, %result, "item admission failed");
                correlation = Correlation::flagged(result);
            }
        }
        Ok(correlation)
    }

    fn correlate_set(&mut self, id: &ObjectId, set: &'a ObjectSet) -> Result<Correlation<'a>, EvaluationError> {
        let parts = set
            .object_refs
            .iter()
            .map(|object_ref| self.correlate(object_ref))
            .collect::<Result<Vec<_>, _>>()?;

        let arity_ok = match set.operator {
            SetOperator::Complement => parts.len() == 2,
            SetOperator::Union | SetOperator::Intersection => matches!(parts.len(), 1 | 2),
        };
        if !arity_ok {
            tracing::warn!(
                object = %id,
                operator = ?set.operator,
                operands = parts.len(),
                "set object has the wrong number of operands"
            );
            return Ok(Correlation::flagged(ResultValue::Error));
        }

        let results: Vec<ResultValue> = parts.iter().map(|p| p.result).collect();
        let result = combine_flags(&results, Operator::And);
        if result != ResultValue::True {
            return Ok(Correlation::flagged(result));
        }

        let contains = |part: &Correlation<'a>, id: ItemId| part.items.iter().any(|i| i.id == id);
        let items: Vec<&'a Item> = match set.operator {
            SetOperator::Union => {
                let mut union: Vec<&'a Item> = Vec::new();
                for item in parts.iter().flat_map(|p| p.items.iter().copied()) {
                    if !union.iter().any(|seen| seen.id == item.id) {
                        union.push(item);
                    }
                }
                union
            }
            SetOperator::Intersection => parts[0]
                .items
                .iter()
                .copied()
                .filter(|item| parts[1..].iter().all(|p| contains(p, item.id)))
                .collect(),
            SetOperator::Complement => parts[0]
                .items
                .iter()
                .copied()
                .filter(|item| !contains(&parts[1], item.id))
                .collect(),
        };
        let mut correlation = Correlation::found(items);
        correlation.incomplete = parts.iter().any(|p| p.incomplete);
        Ok(correlation)
    }

    fn apply_filters(&mut self, filters: &'a [Filter], correlation: &mut Correlation<'a>) -> Result<(), EvaluationError> {
        let definitions = self.definitions;
        for filter in filters {
            let state = definitions
                .state(&filter.state_ref)
                .ok_or_else(|| EvaluationError::missing(ReferenceKind::State, &filter.state_ref))?;
            let mut kept = Vec::with_capacity(correlation.items.len());
            for item in correlation.items.drain(..) {
                let matched = self.evaluate_state(state, item)? == ResultValue::True;
                let keep = match filter.action {
                    FilterAction::Exclude => !matched,
                    FilterAction::Include => matched,
                };
                if keep {
                    kept.push(item);
                }
            }
            correlation.items = kept;
        }
        Ok(())
    }
}
