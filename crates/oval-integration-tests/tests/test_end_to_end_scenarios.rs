//! End-to-end evaluation scenarios.
//!
//! Each scenario builds a definitions document and a system-characteristics
//! store (through the collector registry where collection matters), runs a
//! full evaluation pass, and checks the definition verdicts together with
//! the provenance recorded for them.

use oval_core::{
    Check, CollectionError, Collector, CollectorRegistry, Criteria, CriteriaNode, Datatype,
    Definition, DefinitionClass, DefinitionId, DefinitionSet, Entity, ExistenceCheck,
    ExternalVariables, Item, ItemEntity, ItemStatus, Object, ObjectId, Operation, Operator,
    ResultValue, State, StateId, SystemCharacteristics, Test, TestId,
};
use oval_engine::{CriteriaResult, EvaluationError, Evaluator};

fn def_id(n: u32) -> DefinitionId {
    DefinitionId::new(format!("oval:org.example:def:{n}")).unwrap()
}

fn tst_id(n: u32) -> TestId {
    TestId::new(format!("oval:org.example:tst:{n}")).unwrap()
}

fn obj_id(n: u32) -> ObjectId {
    ObjectId::new(format!("oval:org.example:obj:{n}")).unwrap()
}

fn ste_id(n: u32) -> StateId {
    StateId::new(format!("oval:org.example:ste:{n}")).unwrap()
}

fn definition(n: u32, operator: Operator, children: Vec<CriteriaNode>) -> Definition {
    Definition {
        id: def_id(n),
        class: DefinitionClass::Vulnerability,
        title: format!("scenario {n}"),
        criteria: Some(Criteria::new(operator, children)),
    }
}

fn package(name: &str, version: &str) -> Item {
    Item::new("rpminfo_item")
        .with_entity(ItemEntity::new("name", name))
        .with_entity(ItemEntity::new("version", version).with_datatype(Datatype::Version))
}

fn min_version(n: u32, version: &str) -> State {
    State::new(ste_id(n), "rpminfo_state").with_entity(
        Entity::new("version", version)
            .with_datatype(Datatype::Version)
            .with_operation(Operation::GreaterThanOrEqual),
    )
}

fn evaluate(set: &DefinitionSet, store: &SystemCharacteristics, id: DefinitionId) -> ResultValue {
    let externals = ExternalVariables::new();
    Evaluator::new(set, store, &externals)
        .evaluate(&id)
        .unwrap()
        .result
}

/// Serves a fixed package inventory for `rpminfo_object`s.
struct InventoryCollector {
    packages: Vec<(&'static str, &'static str)>,
}

impl Collector for InventoryCollector {
    fn object_type(&self) -> &str {
        "rpminfo_object"
    }

    fn collect(&self, object: &Object) -> Result<Vec<Item>, CollectionError> {
        let wanted = object
            .entities
            .iter()
            .find(|e| e.name == "name")
            .and_then(|e| e.value.clone());
        Ok(self
            .packages
            .iter()
            .filter(|(name, _)| wanted.as_deref().map_or(true, |w| w == *name))
            .map(|(name, version)| package(name, version))
            .collect())
    }
}

/// Fails every collection.
struct BrokenCollector;

impl Collector for BrokenCollector {
    fn object_type(&self) -> &str {
        "registry_object"
    }

    fn collect(&self, _object: &Object) -> Result<Vec<Item>, CollectionError> {
        Err(CollectionError::AccessDenied {
            object_type: "registry_object".to_string(),
            reason: "hive not readable".to_string(),
        })
    }
}

// ── Scenario 1: check all over matching / mismatching versions ──────

#[test]
fn check_all_versions_match_and_mismatch() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "rpminfo_object")).unwrap();
    set.add_state(min_version(1, "1.2.3")).unwrap();
    set.add_test(
        Test::new(tst_id(1), obj_id(1))
            .with_state(ste_id(1))
            .with_check(Check::All),
    )
    .unwrap();
    set.add_definition(definition(1, Operator::And, vec![CriteriaNode::test(tst_id(1))]))
        .unwrap();

    let patched = CollectorRegistry::new().with(Box::new(InventoryCollector {
        packages: vec![("openssl", "1.2.3"), ("openssh", "9.0")],
    }));
    let store = patched.collect(&set);
    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::True);

    let stale = CollectorRegistry::new().with(Box::new(InventoryCollector {
        packages: vec![("openssl", "1.2.2"), ("openssh", "9.0")],
    }));
    let store = stale.collect(&set);
    let externals = ExternalVariables::new();
    let result = Evaluator::new(&set, &store, &externals)
        .evaluate(&def_id(1))
        .unwrap();
    assert_eq!(result.result, ResultValue::False);
    let tested: Vec<ResultValue> = result.tests[&tst_id(1)]
        .tested_items
        .iter()
        .map(|t| t.result)
        .collect();
    assert_eq!(tested, vec![ResultValue::False, ResultValue::True]);
}

// ── Scenario 2: zero items ──────────────────────────────────────────

#[test]
fn zero_items_depend_on_check_existence() {
    let mut set = DefinitionSet::new();
    set.add_object(
        Object::new(obj_id(1), "rpminfo_object").with_entity(Entity::new("name", "telnet-server")),
    )
    .unwrap();
    set.add_test(Test::new(tst_id(1), obj_id(1))).unwrap();
    set.add_test(Test::new(tst_id(2), obj_id(1)).with_check_existence(ExistenceCheck::NoneExist))
        .unwrap();
    set.add_definition(definition(1, Operator::And, vec![CriteriaNode::test(tst_id(1))]))
        .unwrap();
    set.add_definition(definition(2, Operator::And, vec![CriteriaNode::test(tst_id(2))]))
        .unwrap();

    let registry = CollectorRegistry::new().with(Box::new(InventoryCollector {
        packages: vec![("openssh", "9.0")],
    }));
    let store = registry.collect(&set);
    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::False);
    assert_eq!(evaluate(&set, &store, def_id(2)), ResultValue::True);
}

// ── Scenario 3: XOR ─────────────────────────────────────────────────

#[test]
fn xor_of_two_true_is_false() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "rpminfo_object")).unwrap();
    set.add_test(Test::new(tst_id(1), obj_id(1))).unwrap();
    set.add_test(Test::new(tst_id(2), obj_id(1))).unwrap();
    set.add_definition(definition(
        1,
        Operator::Xor,
        vec![CriteriaNode::test(tst_id(1)), CriteriaNode::test(tst_id(2))],
    ))
    .unwrap();
    let mut store = SystemCharacteristics::new();
    store.record_items(obj_id(1), vec![package("openssh", "9.0")]);
    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::False);
}

// ── Scenario 4: errors propagate through AND and OR ─────────────────

#[test]
fn errored_item_entity_propagates_through_and_or() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "rpminfo_object")).unwrap();
    set.add_object(Object::new(obj_id(2), "rpminfo_object")).unwrap();
    set.add_state(min_version(1, "1.0")).unwrap();
    // Test 1 errors, test 2 is FALSE, test 3 is TRUE.
    set.add_test(Test::new(tst_id(1), obj_id(1)).with_state(ste_id(1))).unwrap();
    set.add_test(Test::new(tst_id(2), obj_id(2)).with_check_existence(ExistenceCheck::NoneExist))
        .unwrap();
    set.add_test(Test::new(tst_id(3), obj_id(2))).unwrap();
    set.add_definition(definition(
        1,
        Operator::And,
        vec![CriteriaNode::test(tst_id(1)), CriteriaNode::test(tst_id(3))],
    ))
    .unwrap();
    set.add_definition(definition(
        2,
        Operator::Or,
        vec![CriteriaNode::test(tst_id(1)), CriteriaNode::test(tst_id(2))],
    ))
    .unwrap();
    set.add_definition(definition(
        3,
        Operator::Or,
        vec![CriteriaNode::test(tst_id(1)), CriteriaNode::test(tst_id(3))],
    ))
    .unwrap();
    set.add_definition(definition(
        4,
        Operator::And,
        vec![CriteriaNode::test(tst_id(1)), CriteriaNode::test(tst_id(2))],
    ))
    .unwrap();

    let mut store = SystemCharacteristics::new();
    store.record_items(
        obj_id(1),
        vec![Item::new("rpminfo_item")
            .with_entity(ItemEntity::new("name", "kernel"))
            .with_entity(ItemEntity::nil("version").with_status(ItemStatus::Error))],
    );
    store.record_items(obj_id(2), vec![package("openssh", "9.0")]);

    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::Error);
    assert_eq!(evaluate(&set, &store, def_id(2)), ResultValue::Error);
    // OR short-circuits to TRUE even alongside ERROR.
    assert_eq!(evaluate(&set, &store, def_id(3)), ResultValue::True);
    // ERROR outranks a FALSE member under AND.
    assert_eq!(evaluate(&set, &store, def_id(4)), ResultValue::Error);
}

#[test]
fn collection_failure_is_error_and_missing_collector_is_unknown() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "registry_object")).unwrap();
    set.add_object(Object::new(obj_id(2), "wmi_object")).unwrap();
    set.add_test(Test::new(tst_id(1), obj_id(1))).unwrap();
    set.add_test(Test::new(tst_id(2), obj_id(2))).unwrap();
    set.add_definition(definition(1, Operator::And, vec![CriteriaNode::test(tst_id(1))]))
        .unwrap();
    set.add_definition(definition(2, Operator::And, vec![CriteriaNode::test(tst_id(2))]))
        .unwrap();

    let store = CollectorRegistry::new()
        .with(Box::new(BrokenCollector))
        .collect(&set);
    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::Error);
    assert_eq!(evaluate(&set, &store, def_id(2)), ResultValue::Unknown);
}

// ── Provenance and isolation ────────────────────────────────────────

#[test]
fn result_tree_records_negation_and_transitive_tests() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "rpminfo_object")).unwrap();
    set.add_state(min_version(1, "10.0")).unwrap();
    set.add_test(Test::new(tst_id(1), obj_id(1)).with_state(ste_id(1))).unwrap();
    set.add_test(Test::new(tst_id(2), obj_id(1))).unwrap();
    set.add_definition(definition(1, Operator::And, vec![CriteriaNode::test(tst_id(1))]))
        .unwrap();
    set.add_definition(definition(
        2,
        Operator::And,
        vec![
            CriteriaNode::extend(def_id(1)).negated(),
            CriteriaNode::test(tst_id(2)),
        ],
    ))
    .unwrap();
    let mut store = SystemCharacteristics::new();
    store.record_items(obj_id(1), vec![package("openssh", "9.0")]);

    let externals = ExternalVariables::new();
    let result = Evaluator::new(&set, &store, &externals)
        .evaluate(&def_id(2))
        .unwrap();
    assert_eq!(result.result, ResultValue::True);
    assert_eq!(result.tests.len(), 2);
    let Some(CriteriaResult::Criteria { children, .. }) = &result.criteria else {
        panic!("expected a criteria root");
    };
    assert!(matches!(
        &children[0],
        CriteriaResult::ExtendDefinition { negate: true, result: ResultValue::True, .. }
    ));
}

#[test]
fn fatal_errors_abort_only_their_definition() {
    let mut set = DefinitionSet::new();
    set.add_object(Object::new(obj_id(1), "rpminfo_object")).unwrap();
    set.add_test(Test::new(tst_id(1), obj_id(1))).unwrap();
    set.add_definition(definition(1, Operator::And, vec![CriteriaNode::test(tst_id(1))]))
        .unwrap();
    set.add_definition(definition(2, Operator::And, vec![CriteriaNode::test(tst_id(9))]))
        .unwrap();
    set.add_definition(definition(3, Operator::Or, vec![CriteriaNode::extend(def_id(3))]))
        .unwrap();
    let mut store = SystemCharacteristics::new();
    store.record_items(obj_id(1), vec![package("openssh", "9.0")]);

    let externals = ExternalVariables::new();
    let outcomes = Evaluator::new(&set, &store, &externals).evaluate_all();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].result(), Some(ResultValue::True));
    assert!(matches!(
        outcomes[1].outcome,
        Err(EvaluationError::MissingReference { .. })
    ));
    assert!(matches!(
        outcomes[2].outcome,
        Err(EvaluationError::CyclicDefinition(_))
    ));
}

#[test]
fn definitions_round_trip_through_json_documents() {
    let definitions = serde_json::json!({
        "definitions": [{
            "id": "oval:org.example:def:1",
            "class": "patch",
            "criteria": {"operator": "OR", "negate": true, "children": [
                {"kind": "criterion", "test_ref": "oval:org.example:tst:1"}
            ]}
        }],
        "tests": [{
            "id": "oval:org.example:tst:1",
            "object_ref": "oval:org.example:obj:1",
            "state_refs": ["oval:org.example:ste:1"],
            "check": "at least one"
        }],
        "objects": [{"id": "oval:org.example:obj:1", "object_type": "rpminfo_object"}],
        "states": [{
            "id": "oval:org.example:ste:1",
            "entities": [{"name": "version", "value": "2.0", "datatype": "version",
                          "operation": "less than"}]
        }]
    });
    let characteristics = serde_json::json!({
        "objects": [{"object_id": "oval:org.example:obj:1", "item_refs": [1, 2]}],
        "items": [
            {"id": 1, "item_type": "rpminfo_item",
             "entities": [{"name": "version", "value": "1.9", "datatype": "version"}]},
            {"id": 2, "item_type": "rpminfo_item",
             "entities": [{"name": "version", "value": "2.1", "datatype": "version"}]}
        ]
    });
    let set: DefinitionSet = serde_json::from_value(definitions).unwrap();
    let store: SystemCharacteristics = serde_json::from_value(characteristics).unwrap();
    assert!(set.validate_references().is_empty());
    // One item is older than 2.0, so the test is TRUE and the negated
    // criteria FALSE.
    assert_eq!(evaluate(&set, &store, def_id(1)), ResultValue::False);
}
