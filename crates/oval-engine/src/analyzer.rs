//! # Entity Analyzer
//!
//! Applies an entity's operation between expected values and collected item
//! entities, turning every per-value failure into a [`ResultValue`]:
//!
//! 1. Item entity status: `error` ⇒ ERROR, `not collected` ⇒ UNKNOWN,
//!    `does not exist` ⇒ FALSE.
//! 2. Nil: both sides nil ⇒ TRUE, exactly one side nil ⇒ FALSE.
//! 3. Records with field entities compare field by field.
//! 4. Otherwise the [comparator](crate::comparator) decides; a
//!    [`ComparisonError`](crate::error::ComparisonError) becomes ERROR.
//!
//! The status check runs before the nil check, so an errored item entity is
//! ERROR for every entity, nil or not.
//!
//! Variable values are resolved by the caller and passed in; this module
//! never touches the definition set. Compiled `pattern match` expressions
//! come from the caller's [`PatternCache`], so a pass compiles each pattern
//! once.

use oval_core::{
    combine_by_check, combine_by_existence, combine_flags, Check, Datatype, Entity, Item,
    ItemEntity, ItemStatus, Operator, ResultValue,
};

use crate::comparator::{compare_sets, PatternCache};

/// Compare an entity's literal value against one item entity.
pub fn analyze(patterns: &mut PatternCache, entity: &Entity, item_entity: &ItemEntity) -> ResultValue {
    analyze_value(patterns, entity, entity.value.as_deref(), item_entity)
}

/// Compare one expected value against one item entity, using the entity's
/// datatype, operation and nil flag.
pub fn analyze_value(
    patterns: &mut PatternCache,
    entity: &Entity,
    expected: Option<&str>,
    item_entity: &ItemEntity,
) -> ResultValue {
    match item_entity.status {
        ItemStatus::Error => return ResultValue::Error,
        ItemStatus::NotCollected => return ResultValue::Unknown,
        ItemStatus::DoesNotExist => return ResultValue::False,
        ItemStatus::Exists => {}
    }

    match (entity.is_nil(), item_entity.is_nil()) {
        (true, true) => return ResultValue::True,
        (true, false) | (false, true) => return ResultValue::False,
        (false, false) => {}
    }

    if entity.datatype == Datatype::Record && !entity.fields.is_empty() {
        return analyze_record(patterns, entity, item_entity);
    }

    let (Some(item_value), Some(expected)) = (item_entity.value.as_deref(), expected) else {
        tracing::debug!(entity = %entity.name, "no value to compare");
        return ResultValue::Error;
    };

    match patterns.compare(entity.datatype, item_value, expected, entity.operation) {
        Ok(matched) => ResultValue::from_bool(matched),
        Err(err) => {
            tracing::debug!(
                entity = %entity.name,
                item_value,
                expected,
                error = %err,
                "comparison failed"
            );
            ResultValue::Error
        }
    }
}

/// Compare a record entity's field entities against the fields of a record
/// item entity.
///
/// Each field entity is matched against every same-named item field and
/// the results are combined by that field entity's `entity_check`; the
/// field results are then AND-combined.
pub fn analyze_record(patterns: &mut PatternCache, entity: &Entity, item_entity: &ItemEntity) -> ResultValue {
    let field_results: Vec<ResultValue> = entity
        .fields
        .iter()
        .map(|field| {
            let matches: Vec<ResultValue> = item_entity
                .fields
                .iter()
                .filter(|f| f.name == field.name)
                .map(|f| analyze(patterns, field, f))
                .collect();
            combine_by_check(&matches, field.entity_check)
        })
        .collect();
    combine_flags(&field_results, Operator::And)
}

// ---------------------------------------------------------------------------
// Multi-valued entities
// ---------------------------------------------------------------------------

/// The expected side of a state or object entity after variable
/// resolution.
#[derive(Debug, Clone, Copy)]
pub enum Expected<'a> {
    /// The entity's own literal (or nil).
    Literal,
    /// Values produced by the entity's variable.
    Values(&'a [String]),
}

impl<'a> Expected<'a> {
    fn values(self, entity: &'a Entity) -> Vec<Option<&'a str>> {
        match self {
            Self::Literal => vec![entity.value.as_deref()],
            Self::Values(values) => values.iter().map(|v| Some(v.as_str())).collect(),
        }
    }
}

/// Evaluate a state entity against an item.
///
/// Per same-named item entity, the per-value results are combined by the
/// entity's `var_check`; the per-item-entity results are combined by its
/// `entity_check`. An item without a same-named entity is therefore FALSE
/// (TRUE under `none satisfy`).
///
/// `subset of` / `superset of` compare the set of all same-named item
/// values against the expected values in one step.
pub fn evaluate_state_entity(
    patterns: &mut PatternCache,
    entity: &Entity,
    expected: Expected<'_>,
    item: &Item,
) -> ResultValue {
    let item_entities: Vec<&ItemEntity> = item.entities_named(&entity.name).collect();

    if entity.operation.is_set_operation() {
        return evaluate_set_entity(entity, expected, &item_entities);
    }

    let values = expected.values(entity);
    let per_entity: Vec<ResultValue> = item_entities
        .iter()
        .map(|item_entity| {
            let per_value: Vec<ResultValue> = values
                .iter()
                .map(|value| analyze_value(patterns, entity, *value, item_entity))
                .collect();
            let check = match expected {
                Expected::Literal => Check::All,
                Expected::Values(_) => entity.var_check,
            };
            combine_by_check(&per_value, check)
        })
        .collect();
    let result = combine_by_check(&per_entity, entity.entity_check);
    tracing::trace!(entity = %entity.name, item = %item.id, %result, "state entity");
    result
}

fn evaluate_set_entity(entity: &Entity, expected: Expected<'_>, item_entities: &[&ItemEntity]) -> ResultValue {
    if item_entities.iter().any(|e| e.status == ItemStatus::Error) {
        return ResultValue::Error;
    }
    if item_entities.iter().any(|e| e.status == ItemStatus::NotCollected) {
        return ResultValue::Unknown;
    }

    let item_values: Vec<String> = item_entities
        .iter()
        .filter(|e| e.status == ItemStatus::Exists)
        .filter_map(|e| e.value.clone())
        .collect();
    let expected_values: Vec<String> = expected
        .values(entity)
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    match compare_sets(entity.datatype, &item_values, &expected_values, entity.operation) {
        Ok(matched) => ResultValue::from_bool(matched),
        Err(err) => {
            tracing::debug!(entity = %entity.name, error = %err, "set comparison failed");
            ResultValue::Error
        }
    }
}

/// Decide whether an item satisfies an object entity.
///
/// Each same-named item entity matches when any expected value matches
/// (OR); the per-item-entity results are combined by the entity's
/// `existence_check`.
pub fn admit_item(
    patterns: &mut PatternCache,
    entity: &Entity,
    expected: Expected<'_>,
    item: &Item,
) -> ResultValue {
    let values = expected.values(entity);
    let per_entity: Vec<ResultValue> = item
        .entities_named(&entity.name)
        .map(|item_entity| {
            let per_value: Vec<ResultValue> = values
                .iter()
                .map(|value| analyze_value(patterns, entity, *value, item_entity))
                .collect();
            if per_value.is_empty() {
                ResultValue::False
            } else {
                combine_flags(&per_value, Operator::Or)
            }
        })
        .collect();
    combine_by_existence(&per_entity, entity.existence_check)
}
