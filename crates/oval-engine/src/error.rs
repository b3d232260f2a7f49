//! # Engine Errors
//!
//! Two tiers of failure, kept strictly apart:
//!
//! - [`ComparisonError`]: a single value could not be compared. The analyzer
//!   logs it and turns it into an ERROR result; it never aborts a pass.
//! - [`EvaluationError`]: the definition graph itself is defective (a cycle
//!   or a dangling reference). It aborts the affected top-level definition
//!   only.

use oval_core::{Datatype, DefinitionId, ObjectId, Operation, ReferenceKind, VariableId};
use thiserror::Error;

/// Why two values could not be compared.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// A value does not parse under the declared datatype.
    #[error("\"{value}\" is not a valid {datatype} value")]
    TypeMismatch {
        /// Declared datatype.
        datatype: Datatype,
        /// The offending value.
        value: String,
    },

    /// A `pattern match` expression failed to compile.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// The operation is not defined for the datatype.
    #[error("operation \"{operation}\" is not defined for datatype {datatype}")]
    UnsupportedOperation {
        /// Declared datatype.
        datatype: Datatype,
        /// Requested operation.
        operation: Operation,
    },
}

/// Why a variable function could not produce a value.
///
/// Like [`ComparisonError`], these are recovered locally: the failing value
/// is dropped and the resolved variable is flagged ERROR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    /// An arithmetic operand is not a number.
    #[error("\"{0}\" is not a number")]
    NotANumber(String),

    /// Integer arithmetic overflowed.
    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A substring starts past the end of the value.
    #[error("substring start {start} is beyond \"{value}\"")]
    SubstringOutOfRange {
        /// The value being cut.
        value: String,
        /// Requested 1-based start.
        start: i64,
    },

    /// A split delimiter was empty.
    #[error("split delimiter must be non-empty")]
    EmptyDelimiter,

    /// A regex capture pattern failed to compile.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A value does not parse under the declared date/time format.
    #[error("\"{value}\" is not a valid {format} date/time")]
    InvalidDateTime {
        /// The offending value.
        value: String,
        /// Expected format name.
        format: &'static str,
    },

    /// A time difference was requested with no operand or too many.
    #[error("time difference takes one or two components, got {0}")]
    TimeDifferenceArity(usize),
}

/// Structural defects that abort evaluation of one definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A definition extends itself, directly or transitively.
    #[error("cyclic definition reference through \"{0}\"")]
    CyclicDefinition(DefinitionId),

    /// A local variable refers back to itself.
    #[error("cyclic variable reference through \"{0}\"")]
    CyclicVariable(VariableId),

    /// A set object, filter, or object component refers back to itself.
    #[error("cyclic object reference through \"{0}\"")]
    CyclicObject(ObjectId),

    /// A referenced element is absent from the definition set.
    #[error("missing {kind} \"{id}\"")]
    MissingReference {
        /// Kind of the missing element.
        kind: ReferenceKind,
        /// The dangling identifier.
        id: String,
    },
}

impl EvaluationError {
    pub(crate) fn missing(kind: ReferenceKind, id: impl std::fmt::Display) -> Self {
        Self::MissingReference {
            kind,
            id: id.to_string(),
        }
    }
}
