//! # Variable Resolver
//!
//! Turns variables and component expression trees into ordered value lists.
//!
//! Every resolution carries a flag next to its values. Per-value failures
//! (a non-numeric arithmetic operand, a substring past the end of a value,
//! a missing external value) drop the offending value and mark the flag
//! ERROR; an object component over an object whose correlation is not TRUE
//! yields no values and carries the correlation's result. The flag is the
//! AND-combination of every marker raised anywhere in the tree.
//!
//! Only structural defects abort resolution: a variable on its own
//! resolution path is a [`EvaluationError::CyclicVariable`], and a
//! reference to an unknown variable or object is a
//! [`EvaluationError::MissingReference`].

use oval_core::{
    combine_flags, Component, ItemStatus, ObjectId, Operator, ReferenceKind, ResultValue,
    VariableId, VariableKind,
};
use serde::Serialize;

use crate::error::{EvaluationError, FunctionError};
use crate::evaluator::EvaluationPass;
use crate::function;

/// The values a variable or component resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValues {
    pub values: Vec<String>,
    /// TRUE unless something in the expression tree failed.
    pub flag: ResultValue,
    /// One line per failure that lowered the flag.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl ResolvedValues {
    /// Successfully resolved values.
    pub fn from_values(values: Vec<String>) -> Self {
        Self {
            values,
            flag: ResultValue::True,
            messages: Vec::new(),
        }
    }

    /// No values, no failure.
    pub fn empty() -> Self {
        Self::from_values(Vec::new())
    }

    /// No values, with `flag` explaining why.
    pub fn flagged(flag: ResultValue, message: impl Into<String>) -> Self {
        Self {
            values: Vec::new(),
            flag,
            messages: vec![message.into()],
        }
    }

    pub fn is_true(&self) -> bool {
        self.flag == ResultValue::True
    }

    fn mark(&mut self, flag: ResultValue, message: impl Into<String>) {
        self.flag = combine_flags(&[self.flag, flag], Operator::And);
        self.messages.push(message.into());
    }

    fn fail(&mut self, err: &FunctionError) {
        self.mark(ResultValue::Error, err.to_string());
    }

    /// Fold `other`'s flag and messages into `self` and hand back its values.
    fn absorb(&mut self, other: ResolvedValues) -> Vec<String> {
        if other.flag != ResultValue::True {
            self.flag = combine_flags(&[self.flag, other.flag], Operator::And);
        }
        self.messages.extend(other.messages);
        other.values
    }

    fn push_results(&mut self, results: Vec<Result<String, FunctionError>>) {
        for result in results {
            match result {
                Ok(value) => self.values.push(value),
                Err(err) => self.fail(&err),
            }
        }
    }
}

impl EvaluationPass<'_> {
    /// Resolve a variable, reusing an earlier resolution from this pass.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::CyclicVariable`] when the variable depends on
    /// itself; [`EvaluationError::MissingReference`] for unknown variables
    /// or objects reached through it.
    pub fn resolve_variable(&mut self, id: &VariableId) -> Result<ResolvedValues, EvaluationError> {
        if let Some(cached) = self.variable_cache.get(id) {
            return Ok(cached.clone());
        }
        let definitions = self.definitions;
        let variable = definitions
            .variable(id)
            .ok_or_else(|| EvaluationError::missing(ReferenceKind::Variable, id))?;
        if !self.active_variables.insert(id.clone()) {
            return Err(EvaluationError::CyclicVariable(id.clone()));
        }

        let outcome = match &variable.kind {
            VariableKind::Local { component } => self.resolve_component(component),
            VariableKind::External => Ok(match self.externals.get(id) {
                Some(values) => ResolvedValues::from_values(values.to_vec()),
                None => ResolvedValues::flagged(
                    ResultValue::Error,
                    format!("no value supplied for external variable \"{id}\""),
                ),
            }),
            VariableKind::Constant { values } => Ok(ResolvedValues::from_values(values.clone())),
        };
        self.active_variables.remove(id);
        let resolved = outcome?;

        tracing::debug!(
            variable = %id,
            values = resolved.values.len(),
            flag = %resolved.flag,
            "variable resolved"
        );
        self.variable_cache.insert(id.clone(), resolved.clone());
        Ok(resolved)
    }

    /// Resolve one component expression.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors from referenced variables and objects.
    pub fn resolve_component(&mut self, component: &Component) -> Result<ResolvedValues, EvaluationError> {
        let mut acc = ResolvedValues::empty();
        match component {
            Component::Literal { value, .. } => acc.values.push(value.clone()),
            Component::ObjectComponent {
                object_ref,
                item_field,
                record_field,
            } => return self.resolve_object_component(object_ref, item_field, record_field.as_deref()),
            Component::VariableRef { var_ref } => return self.resolve_variable(var_ref),
            Component::Concat { components } => {
                let lists = self.resolve_lists(components, &mut acc)?;
                acc.values = function::concat(&lists);
            }
            Component::Arithmetic {
                operation,
                components,
            } => {
                let lists = self.resolve_lists(components, &mut acc)?;
                acc.push_results(function::arithmetic(*operation, &lists));
            }
            Component::Substring {
                start,
                length,
                component,
            } => {
                let values = acc.absorb(self.resolve_component(component)?);
                acc.push_results(function::substring(&values, *start, *length));
            }
            Component::Split {
                delimiter,
                component,
            } => {
                let values = acc.absorb(self.resolve_component(component)?);
                match function::split(&values, delimiter) {
                    Ok(parts) => acc.values = parts,
                    Err(err) => acc.fail(&err),
                }
            }
            Component::Begin {
                character,
                component,
            } => {
                let values = acc.absorb(self.resolve_component(component)?);
                acc.values = function::begin(&values, character);
            }
            Component::End {
                character,
                component,
            } => {
                let values = acc.absorb(self.resolve_component(component)?);
                acc.values = function::end(&values, character);
            }
            Component::EscapeRegex { component } => {
                let values = acc.absorb(self.resolve_component(component)?);
                acc.values = function::escape_regex(&values);
            }
            Component::RegexCapture { pattern, component } => {
                let values = acc.absorb(self.resolve_component(component)?);
                match function::regex_capture(&values, pattern) {
                    Ok(captures) => acc.values = captures,
                    Err(err) => acc.fail(&err),
                }
            }
            Component::Unique { components } => {
                let lists = self.resolve_lists(components, &mut acc)?;
                acc.values = function::unique(lists.into_iter().flatten());
            }
            Component::Count { components } => {
                let lists = self.resolve_lists(components, &mut acc)?;
                acc.values = vec![function::count(&lists)];
            }
            Component::TimeDifference {
                format_1,
                format_2,
                components,
            } => {
                let lists = self.resolve_lists(components, &mut acc)?;
                let reference = self.reference_time;
                acc.push_results(function::time_difference(*format_1, *format_2, &lists, reference));
            }
        }
        Ok(acc)
    }

    fn resolve_lists(
        &mut self,
        components: &[Component],
        acc: &mut ResolvedValues,
    ) -> Result<Vec<Vec<String>>, EvaluationError> {
        components
            .iter()
            .map(|component| self.resolve_component(component).map(|resolved| acc.absorb(resolved)))
            .collect()
    }

    /// Values of `item_field` (or one of its record fields) across the items
    /// correlated for an object, in item order.
    fn resolve_object_component(
        &mut self,
        object_ref: &ObjectId,
        item_field: &str,
        record_field: Option<&str>,
    ) -> Result<ResolvedValues, EvaluationError> {
        let key = (
            object_ref.clone(),
            item_field.to_string(),
            record_field.map(str::to_string),
        );
        if let Some(cached) = self.component_cache.get(&key) {
            return Ok(cached.clone());
        }

        let correlation = self.correlate(object_ref)?;
        let resolved = if correlation.result == ResultValue::True {
            let mut resolved = ResolvedValues::empty();
            for item in &correlation.items {
                for entity in item.entities_named(item_field) {
                    let source = match record_field {
                        Some(field) => match entity.field(field) {
                            Some(source) => source,
                            None => continue,
                        },
                        None => entity,
                    };
                    match source.status {
                        ItemStatus::Exists => resolved.values.extend(source.value.clone()),
                        ItemStatus::DoesNotExist => {}
                        ItemStatus::Error => resolved.mark(
                            ResultValue::Error,
                            format!("item {} has an errored \"{item_field}\"", item.id),
                        ),
                        ItemStatus::NotCollected => resolved.mark(
                            ResultValue::Unknown,
                            format!("item {} did not collect \"{item_field}\"", item.id),
                        ),
                    }
                }
            }
            resolved
        } else {
            ResolvedValues::flagged(
                correlation.result,
                format!("object \"{object_ref}\" correlated {}", correlation.result),
            )
        };

        self.component_cache.insert(key, resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use oval_core::{
        ArithmeticOperation, CollectedFlag, CollectedObject, Datatype, DateTimeFormat,
        DefinitionSet, ExternalVariables, Item, ItemEntity, Object, SystemCharacteristics,
        Variable,
    };

    use crate::evaluator::{EvaluationOptions, Evaluator};

    fn var_id(n: u32) -> VariableId {
        VariableId::new(format!("oval:x:var:{n}")).unwrap()
    }

    fn obj_id(n: u32) -> ObjectId {
        ObjectId::new(format!("oval:x:obj:{n}")).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Resolve `component` against `set`/`store` with a fixed reference time.
    fn resolve_with(
        set: &DefinitionSet,
        store: &SystemCharacteristics,
        externals: &ExternalVariables,
        component: &Component,
    ) -> Result<ResolvedValues, EvaluationError> {
        let options = EvaluationOptions {
            reference_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        };
        let evaluator = Evaluator::new(set, store, externals).with_options(options);
        evaluator.pass().resolve_component(component)
    }

    fn resolve(component: &Component) -> ResolvedValues {
        resolve_with(
            &DefinitionSet::new(),
            &SystemCharacteristics::new(),
            &ExternalVariables::new(),
            component,
        )
        .unwrap()
    }

    fn two_valued(set: &mut DefinitionSet, n: u32, values: &[&str]) -> Component {
        set.add_variable(Variable::constant(var_id(n), Datatype::String, strings(values)))
            .unwrap();
        Component::variable(var_id(n))
    }

    // ── Functions through the resolver ──────────────────────────────

    #[test]
    fn literal_resolves_to_single_true_value() {
        let resolved = resolve(&Component::literal("x"));
        assert_eq!(resolved.values, strings(&["x"]));
        assert!(resolved.is_true());
    }

    #[test]
    fn concat_expands_cartesian_product() {
        let mut set = DefinitionSet::new();
        let left = two_valued(&mut set, 1, &["a", "b"]);
        let right = two_valued(&mut set, 2, &["1", "2"]);
        let component = Component::Concat {
            components: vec![left, right],
        };
        let resolved = resolve_with(
            &set,
            &SystemCharacteristics::new(),
            &ExternalVariables::new(),
            &component,
        )
        .unwrap();
        assert_eq!(resolved.values, strings(&["a1", "a2", "b1", "b2"]));
        assert!(resolved.is_true());
    }

    #[test]
    fn arithmetic_failure_flags_error_and_keeps_other_values() {
        let mut set = DefinitionSet::new();
        let numbers = two_valued(&mut set, 1, &["4", "x"]);
        let component = Component::Arithmetic {
            operation: ArithmeticOperation::Add,
            components: vec![numbers, Component::literal("1")],
        };
        let resolved = resolve_with(
            &set,
            &SystemCharacteristics::new(),
            &ExternalVariables::new(),
            &component,
        )
        .unwrap();
        assert_eq!(resolved.values, strings(&["5"]));
        assert_eq!(resolved.flag, ResultValue::Error);
        assert_eq!(resolved.messages.len(), 1);
    }

    #[test]
    fn substring_past_end_flags_error() {
        let component = Component::Substring {
            start: 10,
            length: 2,
            component: Box::new(Component::literal("abc")),
        };
        let resolved = resolve(&component);
        assert!(resolved.values.is_empty());
        assert_eq!(resolved.flag, ResultValue::Error);
    }

    #[test]
    fn nested_string_functions() {
        let component = Component::Begin {
            character: "/".to_string(),
            component: Box::new(Component::Split {
                delimiter: ":".to_string(),
                component: Box::new(Component::literal("usr:opt")),
            }),
        };
        assert_eq!(resolve(&component).values, strings(&["/usr", "/opt"]));
    }

    #[test]
    fn count_and_unique_span_all_children() {
        let unique = Component::Unique {
            components: vec![Component::literal("a"), Component::literal("b"), Component::literal("a")],
        };
        assert_eq!(resolve(&unique).values, strings(&["a", "b"]));
        let count = Component::Count {
            components: vec![Component::literal("a"), Component::literal("b")],
        };
        assert_eq!(resolve(&count).values, strings(&["2"]));
    }

    #[test]
    fn time_difference_uses_reference_time() {
        let component = Component::TimeDifference {
            format_1: DateTimeFormat::SecondsSinceEpoch,
            format_2: DateTimeFormat::SecondsSinceEpoch,
            components: vec![Component::literal("1704110400")],
        };
        // 2024-01-02T00:00:00Z minus 2024-01-01T12:00:00Z.
        assert_eq!(resolve(&component).values, strings(&["43200"]));
    }

    // ── Variables ───────────────────────────────────────────────────

    #[test]
    fn missing_external_value_flags_error() {
        let mut set = DefinitionSet::new();
        set.add_variable(Variable::external(var_id(1), Datatype::String)).unwrap();
        let store = SystemCharacteristics::new();
        let externals = ExternalVariables::new();
        let resolved = resolve_with(&set, &store, &externals, &Component::variable(var_id(1))).unwrap();
        assert!(resolved.values.is_empty());
        assert_eq!(resolved.flag, ResultValue::Error);

        let externals = ExternalVariables::new().with(var_id(1), strings(&["on"]));
        let resolved = resolve_with(&set, &store, &externals, &Component::variable(var_id(1))).unwrap();
        assert_eq!(resolved.values, strings(&["on"]));
        assert!(resolved.is_true());
    }

    #[test]
    fn cyclic_variables_are_fatal() {
        let mut set = DefinitionSet::new();
        set.add_variable(Variable::local(var_id(1), Datatype::String, Component::variable(var_id(2))))
            .unwrap();
        set.add_variable(Variable::local(
            var_id(2),
            Datatype::String,
            Component::Concat {
                components: vec![Component::literal("x"), Component::variable(var_id(1))],
            },
        ))
        .unwrap();
        let err = resolve_with(
            &set,
            &SystemCharacteristics::new(),
            &ExternalVariables::new(),
            &Component::variable(var_id(1)),
        )
        .unwrap_err();
        assert!(matches!(err, EvaluationError::CyclicVariable(_)));
    }

    #[test]
    fn unknown_variable_is_missing_reference() {
        let err = resolve_with(
            &DefinitionSet::new(),
            &SystemCharacteristics::new(),
            &ExternalVariables::new(),
            &Component::variable(var_id(7)),
        )
        .unwrap_err();
        assert_eq!(err, EvaluationError::missing(ReferenceKind::Variable, var_id(7)));
    }

    #[test]
    fn failed_resolution_does_not_leave_variable_active() {
        let mut set = DefinitionSet::new();
        set.add_variable(Variable::local(var_id(1), Datatype::String, Component::variable(var_id(9))))
            .unwrap();
        let store = SystemCharacteristics::new();
        let externals = ExternalVariables::new();
        let evaluator = Evaluator::new(&set, &store, &externals);
        let mut pass = evaluator.pass();
        assert!(pass.resolve_variable(&var_id(1)).is_err());
        assert!(pass.active_variables.is_empty());
        assert!(pass.variable_cache.is_empty());
    }

    // ── Object components ───────────────────────────────────────────

    #[test]
    fn object_component_reads_item_and_record_fields() {
        let mut set = DefinitionSet::new();
        set.add_object(Object::new(obj_id(1), "user_object")).unwrap();
        let mut store = SystemCharacteristics::new();
        store.record_items(
            obj_id(1),
            vec![
                Item::new("user_item")
                    .with_entity(ItemEntity::new("name", "root"))
                    .with_entity(ItemEntity::record(
                        "profile",
                        vec![ItemEntity::new("shell", "/bin/sh")],
                    )),
                Item::new("user_item").with_entity(ItemEntity::new("name", "daemon")),
            ],
        );
        let externals = ExternalVariables::new();

        let names = resolve_with(&set, &store, &externals, &Component::object(obj_id(1), "name")).unwrap();
        assert_eq!(names.values, strings(&["root", "daemon"]));

        let shells = Component::ObjectComponent {
            object_ref: obj_id(1),
            item_field: "profile".to_string(),
            record_field: Some("shell".to_string()),
        };
        let shells = resolve_with(&set, &store, &externals, &shells).unwrap();
        assert_eq!(shells.values, strings(&["/bin/sh"]));
        assert!(shells.is_true());
    }

    #[test]
    fn object_component_carries_correlation_flag() {
        let mut set = DefinitionSet::new();
        set.add_object(Object::new(obj_id(1), "user_object")).unwrap();
        let mut store = SystemCharacteristics::new();
        store.record_object(CollectedObject::new(obj_id(1), CollectedFlag::Error));
        let resolved = resolve_with(
            &set,
            &store,
            &ExternalVariables::new(),
            &Component::object(obj_id(1), "name"),
        )
        .unwrap();
        assert!(resolved.values.is_empty());
        assert_eq!(resolved.flag, ResultValue::Error);
    }

    #[test]
    fn errored_item_entity_flags_object_component() {
        let mut set = DefinitionSet::new();
        set.add_object(Object::new(obj_id(1), "user_object")).unwrap();
        let mut store = SystemCharacteristics::new();
        store.record_items(
            obj_id(1),
            vec![Item::new("user_item").with_entity(
                ItemEntity::nil("name").with_status(ItemStatus::Error),
            )],
        );
        let resolved = resolve_with(
            &set,
            &store,
            &ExternalVariables::new(),
            &Component::object(obj_id(1), "name"),
        )
        .unwrap();
        assert_eq!(resolved.flag, ResultValue::Error);
    }
}
