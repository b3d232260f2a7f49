//! # oval-core — Foundational Types for the OVAL Evaluator
//!
//! This crate defines the model every other crate in the workspace works
//! on: identifiers, datatypes and operations, the result lattice, the
//! entity/item model, definitions, variables, the system-characteristics
//! store, and the collector contract. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `DefinitionId`, `TestId`, `ObjectId`,
//!    `StateId`, `VariableId` are distinct types with validated
//!    constructors. `ItemId` is assigned by the store.
//!
//! 2. **Closed enums, exhaustive `match`.** `Datatype`, `Operation`,
//!    `ResultValue`, `Check`, `ExistenceCheck`, and `Operator` are closed
//!    sets; adding a variant forces every consumer to handle it.
//!
//! 3. **One lattice.** Every layer combines results through
//!    [`combine_flags`], [`combine_by_check`], or [`combine_by_existence`].
//!
//! 4. **Read-only inputs.** `DefinitionSet` and `SystemCharacteristics` are
//!    built up front and only borrowed during evaluation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `oval-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod characteristics;
pub mod collector;
pub mod datatype;
pub mod definition;
pub mod entity;
pub mod error;
pub mod identity;
pub mod result;
pub mod variable;

// Re-export primary types for ergonomic imports.
pub use characteristics::{
    CollectedFlag, CollectedObject, SystemCharacteristics, SystemCharacteristicsDocument,
};
pub use collector::{Collector, CollectorRegistry};
pub use datatype::{Datatype, Operation};
pub use definition::{
    Criteria, CriteriaNode, Criterion, DanglingReference, Definition, DefinitionClass,
    DefinitionDocument, DefinitionSet, ExtendDefinition, Filter, FilterAction, Object, ObjectSet,
    ReferenceKind, SetOperator, State, Test,
};
pub use entity::{Entity, Item, ItemEntity, ItemStatus};
pub use error::{CollectionError, OvalError, ValidationError};
pub use identity::{DefinitionId, ItemId, ObjectId, StateId, TestId, VariableId};
pub use result::{
    combine_by_check, combine_by_existence, combine_flags, Check, ExistenceCheck, Operator,
    ResultCounts, ResultValue,
};
pub use variable::{
    ArithmeticOperation, Component, DateTimeFormat, ExternalVariables, Variable, VariableKind,
    VariableValue,
};
