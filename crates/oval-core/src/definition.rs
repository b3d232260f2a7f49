//! # Definition Model
//!
//! The in-memory form of a definitions document: definitions with criteria
//! trees, tests, objects, states, and variables, gathered in a
//! [`DefinitionSet`] indexed by identifier.
//!
//! The set is built once (programmatically or from a JSON
//! [`DefinitionDocument`]) and is read-only during evaluation. Dangling
//! references are not rejected at construction time; the evaluator reports
//! them as fatal errors for the affected definition, and
//! [`DefinitionSet::validate_references`] lists them up front.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::ValidationError;
use crate::identity::{DefinitionId, ObjectId, StateId, TestId, VariableId};
use crate::result::{Check, ExistenceCheck, Operator};
use crate::variable::{Component, Variable, VariableKind};

// ---------------------------------------------------------------------------
// Definitions and criteria
// ---------------------------------------------------------------------------

/// The class of statement a definition makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionClass {
    #[default]
    Compliance,
    Inventory,
    Miscellaneous,
    Patch,
    Vulnerability,
}

/// A top-level assessable statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    #[serde(default)]
    pub class: DefinitionClass,
    #[serde(default)]
    pub title: String,
    /// Root of the criteria tree; a definition without criteria is not
    /// evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
}

/// A boolean node combining its children with an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub negate: bool,
    pub children: Vec<CriteriaNode>,
}

/// A leaf referencing a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub test_ref: TestId,
    #[serde(default)]
    pub negate: bool,
}

/// A leaf reusing another definition's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendDefinition {
    pub definition_ref: DefinitionId,
    #[serde(default)]
    pub negate: bool,
}

/// Any node of a criteria tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriteriaNode {
    Criteria(Criteria),
    Criterion(Criterion),
    ExtendDefinition(ExtendDefinition),
}

impl Criteria {
    /// A non-negated criteria node.
    pub fn new(operator: Operator, children: Vec<CriteriaNode>) -> Self {
        Self {
            operator,
            negate: false,
            children,
        }
    }
}

impl CriteriaNode {
    /// A non-negated criterion.
    pub fn test(test_ref: TestId) -> Self {
        Self::Criterion(Criterion {
            test_ref,
            negate: false,
        })
    }

    /// A non-negated extend-definition.
    pub fn extend(definition_ref: DefinitionId) -> Self {
        Self::ExtendDefinition(ExtendDefinition {
            definition_ref,
            negate: false,
        })
    }

    /// Return a copy of this node with its negate flag set.
    pub fn negated(mut self) -> Self {
        match &mut self {
            Self::Criteria(c) => c.negate = true,
            Self::Criterion(c) => c.negate = true,
            Self::ExtendDefinition(e) => e.negate = true,
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests, objects, states
// ---------------------------------------------------------------------------

fn default_check_existence() -> ExistenceCheck {
    ExistenceCheck::AtLeastOneExists
}

/// Binds an object to zero or more states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub id: TestId,
    pub object_ref: ObjectId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_refs: Vec<StateId>,
    /// How many items must satisfy the states.
    #[serde(default)]
    pub check: Check,
    /// How many items must exist.
    #[serde(default = "default_check_existence")]
    pub check_existence: ExistenceCheck,
    /// Connective combining multiple states for one item.
    #[serde(default)]
    pub state_operator: Operator,
}

impl Test {
    /// An existence-only test (`check = all`, `at_least_one_exists`).
    pub fn new(id: TestId, object_ref: ObjectId) -> Self {
        Self {
            id,
            object_ref,
            state_refs: Vec::new(),
            check: Check::All,
            check_existence: ExistenceCheck::AtLeastOneExists,
            state_operator: Operator::And,
        }
    }

    pub fn with_state(mut self, state: StateId) -> Self {
        self.state_refs.push(state);
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.check = check;
        self
    }

    pub fn with_check_existence(mut self, existence: ExistenceCheck) -> Self {
        self.check_existence = existence;
        self
    }
}

/// Set algebra applied to the item sets of referenced objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetOperator {
    #[default]
    Union,
    Intersection,
    Complement,
}

/// A set object: the combination of one or two referenced objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSet {
    #[serde(default)]
    pub operator: SetOperator,
    pub object_refs: Vec<ObjectId>,
}

/// Whether a filter keeps or drops matching items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    #[default]
    Exclude,
    Include,
}

/// Narrows an object's items by a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub action: FilterAction,
    pub state_ref: StateId,
}

/// A fact selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    /// Collector tag, e.g. `file_object`.
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Present for set objects, which are never collected directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<ObjectSet>,
}

impl Object {
    pub fn new(id: ObjectId, object_type: impl Into<String>) -> Self {
        Self {
            id,
            object_type: object_type.into(),
            entities: Vec::new(),
            filters: Vec::new(),
            set: None,
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_filter(mut self, action: FilterAction, state_ref: StateId) -> Self {
        self.filters.push(Filter { action, state_ref });
        self
    }

    pub fn with_set(mut self, operator: SetOperator, object_refs: Vec<ObjectId>) -> Self {
        self.set = Some(ObjectSet {
            operator,
            object_refs,
        });
        self
    }

    /// Whether this is a set object.
    pub fn is_set(&self) -> bool {
        self.set.is_some()
    }
}

/// Expected values for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    #[serde(default)]
    pub state_type: String,
    #[serde(default)]
    pub operator: Operator,
    pub entities: Vec<Entity>,
}

impl State {
    pub fn new(id: StateId, state_type: impl Into<String>) -> Self {
        Self {
            id,
            state_type: state_type.into(),
            operator: Operator::And,
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// The kind of element a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Definition,
    Test,
    Object,
    State,
    Variable,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Definition => "definition",
            Self::Test => "test",
            Self::Object => "object",
            Self::State => "state",
            Self::Variable => "variable",
        };
        f.write_str(s)
    }
}

/// A reference to an identifier that is absent from the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    /// Element holding the reference.
    pub from: String,
    pub kind: ReferenceKind,
    /// The missing identifier.
    pub id: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} references missing {} \"{}\"", self.from, self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// DefinitionSet
// ---------------------------------------------------------------------------

/// Serialized layout of a definitions document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub tests: Vec<Test>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// All elements of a definitions document, indexed by identifier.
///
/// `BTreeMap` keeps iteration deterministic so that `evaluate_all` reports
/// definitions in identifier order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    definitions: BTreeMap<DefinitionId, Definition>,
    tests: BTreeMap<TestId, Test>,
    objects: BTreeMap<ObjectId, Object>,
    states: BTreeMap<StateId, State>,
    variables: BTreeMap<VariableId, Variable>,
}

fn insert_unique<K: Ord + Clone + fmt::Display, V>(
    map: &mut BTreeMap<K, V>,
    kind: &'static str,
    id: &K,
    value: V,
) -> Result<(), ValidationError> {
    if map.contains_key(id) {
        return Err(ValidationError::DuplicateIdentifier {
            kind,
            id: id.to_string(),
        });
    }
    map.insert(id.clone(), value);
    Ok(())
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateIdentifier`] if the id is taken.
    pub fn add_definition(&mut self, definition: Definition) -> Result<(), ValidationError> {
        let id = definition.id.clone();
        insert_unique(&mut self.definitions, "definition", &id, definition)
    }

    /// Add a test.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateIdentifier`] if the id is taken.
    pub fn add_test(&mut self, test: Test) -> Result<(), ValidationError> {
        let id = test.id.clone();
        insert_unique(&mut self.tests, "test", &id, test)
    }

    /// Add an object after validating its entities.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateIdentifier`] if the id is taken,
    /// or [`ValidationError::InvalidEntity`] for a malformed entity.
    pub fn add_object(&mut self, object: Object) -> Result<(), ValidationError> {
        object.entities.iter().try_for_each(Entity::validate)?;
        let id = object.id.clone();
        insert_unique(&mut self.objects, "object", &id, object)
    }

    /// Add a state after validating its entities.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateIdentifier`] if the id is taken,
    /// or [`ValidationError::InvalidEntity`] for a malformed entity.
    pub fn add_state(&mut self, state: State) -> Result<(), ValidationError> {
        state.entities.iter().try_for_each(Entity::validate)?;
        let id = state.id.clone();
        insert_unique(&mut self.states, "state", &id, state)
    }

    /// Add a variable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateIdentifier`] if the id is taken.
    pub fn add_variable(&mut self, variable: Variable) -> Result<(), ValidationError> {
        let id = variable.id.clone();
        insert_unique(&mut self.variables, "variable", &id, variable)
    }

    pub fn definition(&self, id: &DefinitionId) -> Option<&Definition> {
        self.definitions.get(id)
    }

    pub fn test(&self, id: &TestId) -> Option<&Test> {
        self.tests.get(id)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Definitions in identifier order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    /// Objects in identifier order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// List every reference to an identifier that is not in the set.
    ///
    /// The evaluator does not call this; it is a pre-flight check for
    /// tooling. The result is ordered by the referencing element.
    pub fn validate_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        let mut push = |from: &dyn fmt::Display, kind: ReferenceKind, id: &dyn fmt::Display| {
            dangling.push(DanglingReference {
                from: from.to_string(),
                kind,
                id: id.to_string(),
            });
        };

        for definition in self.definitions.values() {
            let mut stack: Vec<&CriteriaNode> = Vec::new();
            if let Some(criteria) = &definition.criteria {
                stack.extend(criteria.children.iter());
            }
            while let Some(node) = stack.pop() {
                match node {
                    CriteriaNode::Criteria(c) => stack.extend(c.children.iter()),
                    CriteriaNode::Criterion(c) => {
                        if !self.tests.contains_key(&c.test_ref) {
                            push(&definition.id, ReferenceKind::Test, &c.test_ref);
                        }
                    }
                    CriteriaNode::ExtendDefinition(e) => {
                        if !self.definitions.contains_key(&e.definition_ref) {
                            push(&definition.id, ReferenceKind::Definition, &e.definition_ref);
                        }
                    }
                }
            }
        }

        for test in self.tests.values() {
            if !self.objects.contains_key(&test.object_ref) {
                push(&test.id, ReferenceKind::Object, &test.object_ref);
            }
            for state_ref in &test.state_refs {
                if !self.states.contains_key(state_ref) {
                    push(&test.id, ReferenceKind::State, state_ref);
                }
            }
        }

        for object in self.objects.values() {
            for var_ref in object.entities.iter().filter_map(|e| e.var_ref.as_ref()) {
                if !self.variables.contains_key(var_ref) {
                    push(&object.id, ReferenceKind::Variable, var_ref);
                }
            }
            for filter in &object.filters {
                if !self.states.contains_key(&filter.state_ref) {
                    push(&object.id, ReferenceKind::State, &filter.state_ref);
                }
            }
            if let Some(set) = &object.set {
                for object_ref in &set.object_refs {
                    if !self.objects.contains_key(object_ref) {
                        push(&object.id, ReferenceKind::Object, object_ref);
                    }
                }
            }
        }

        for state in self.states.values() {
            for var_ref in state.entities.iter().filter_map(|e| e.var_ref.as_ref()) {
                if !self.variables.contains_key(var_ref) {
                    push(&state.id, ReferenceKind::Variable, var_ref);
                }
            }
        }

        for variable in self.variables.values() {
            if let VariableKind::Local { component } = &variable.kind {
                let mut stack = vec![component];
                while let Some(component) = stack.pop() {
                    match component {
                        Component::VariableRef { var_ref } => {
                            if !self.variables.contains_key(var_ref) {
                                push(&variable.id, ReferenceKind::Variable, var_ref);
                            }
                        }
                        Component::ObjectComponent { object_ref, .. } => {
                            if !self.objects.contains_key(object_ref) {
                                push(&variable.id, ReferenceKind::Object, object_ref);
                            }
                        }
                        _ => {}
                    }
                    stack.extend(component.children());
                }
            }
        }

        dangling
    }
}

impl TryFrom<DefinitionDocument> for DefinitionSet {
    type Error = ValidationError;

    fn try_from(document: DefinitionDocument) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for definition in document.definitions {
            set.add_definition(definition)?;
        }
        for test in document.tests {
            set.add_test(test)?;
        }
        for object in document.objects {
            set.add_object(object)?;
        }
        for state in document.states {
            set.add_state(state)?;
        }
        for variable in document.variables {
            set.add_variable(variable)?;
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for DefinitionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = DefinitionDocument::deserialize(deserializer)?;
        Self::try_from(document).map_err(serde::de::Error::custom)
    }
}
