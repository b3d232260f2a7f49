//! # Error Hierarchy
//!
//! Structured error types for the foundational layer, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Evaluation-time failures live in `oval-engine`; this module covers the
//! failures that can occur while *building* the model: malformed
//! identifiers, duplicate definitions, unknown keywords, and errors reported
//! by fact collectors.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum OvalError {
    /// Model construction rejected an input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A collector failed while gathering items.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors raised while constructing identifiers and documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier string was empty or whitespace-only.
    #[error("invalid {kind} identifier: must be non-empty")]
    EmptyIdentifier {
        /// Which identifier kind was being constructed.
        kind: &'static str,
    },

    /// Two elements of the same kind share an identifier.
    #[error("duplicate {kind} identifier \"{id}\"")]
    DuplicateIdentifier {
        /// Element kind (definition, test, object, state, variable).
        kind: &'static str,
        /// The repeated identifier.
        id: String,
    },

    /// A keyword did not name any known enumeration value.
    #[error("unknown {kind} \"{value}\"")]
    UnknownKeyword {
        /// Enumeration being parsed (datatype, operation, ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// An entity is structurally inconsistent.
    #[error("invalid entity \"{name}\": {reason}")]
    InvalidEntity {
        /// Entity name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors reported by a fact collector for one object.
///
/// These never abort evaluation: the store records them as an `error`
/// collected-object flag and tests over that object evaluate to ERROR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The collector could not access the underlying system resource.
    #[error("access denied while collecting {object_type}: {reason}")]
    AccessDenied {
        /// Object type tag of the failing collector.
        object_type: String,
        /// Collector-provided detail.
        reason: String,
    },

    /// The object uses a behavior or entity the collector cannot honour.
    #[error("unsupported {object_type} object: {reason}")]
    Unsupported {
        /// Object type tag of the failing collector.
        object_type: String,
        /// Collector-provided detail.
        reason: String,
    },

    /// Any other collector failure.
    #[error("{object_type} collection failed: {reason}")]
    Failed {
        /// Object type tag of the failing collector.
        object_type: String,
        /// Collector-provided detail.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifier_names_kind() {
        let err = ValidationError::EmptyIdentifier { kind: "state" };
        assert!(format!("{err}").contains("state"));
    }

    #[test]
    fn duplicate_identifier_display() {
        let err = ValidationError::DuplicateIdentifier {
            kind: "test",
            id: "oval:x:tst:1".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("duplicate test"));
        assert!(msg.contains("oval:x:tst:1"));
    }

    #[test]
    fn oval_error_wraps_validation() {
        let err = OvalError::from(ValidationError::UnknownKeyword {
            kind: "datatype",
            value: "quaternion".to_string(),
        });
        let msg = format!("{err}");
        assert!(msg.contains("validation error"));
        assert!(msg.contains("quaternion"));
    }

    #[test]
    fn collection_error_display() {
        let err = CollectionError::AccessDenied {
            object_type: "file_object".to_string(),
            reason: "permission denied".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("file_object"));
        assert!(msg.contains("permission denied"));
    }
}
