//! # Datatypes and Operations
//!
//! The closed set of value datatypes and comparison operations. Values are
//! always carried as strings; the [`Datatype`] decides how they are parsed
//! and ordered. Every comparison dispatches through an exhaustive `match`
//! over ([`Datatype`], [`Operation`]), so adding a variant is a compile
//! error until the comparator handles it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Datatype
// ---------------------------------------------------------------------------

/// The declared datatype of an entity or item entity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    /// Arbitrary text.
    #[default]
    String,
    /// Signed 64-bit integer (decimal, or hex with a `0x` prefix).
    Int,
    /// IEEE-754 double.
    Float,
    /// `true`/`false`/`1`/`0`.
    Boolean,
    /// Dotted version, compared component-wise.
    Version,
    /// RPM-style `epoch:version-release`.
    EvrString,
    /// HP-UX fileset revision.
    FilesetRevision,
    /// Cisco IOS train version, e.g. `12.2(31)SB2`.
    IosVersion,
    /// Base64-encoded bytes.
    Binary,
    /// Composite value with named fields.
    Record,
}

impl Datatype {
    /// Return all datatypes as a slice.
    pub fn all() -> &'static [Datatype] {
        &[
            Self::String,
            Self::Int,
            Self::Float,
            Self::Boolean,
            Self::Version,
            Self::EvrString,
            Self::FilesetRevision,
            Self::IosVersion,
            Self::Binary,
            Self::Record,
        ]
    }

    /// The canonical keyword for this datatype.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Version => "version",
            Self::EvrString => "evr_string",
            Self::FilesetRevision => "fileset_revision",
            Self::IosVersion => "ios_version",
            Self::Binary => "binary",
            Self::Record => "record",
        }
    }

    /// Whether values of this datatype are ordered numerically.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKeyword {
                kind: "datatype",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Comparison applied between an expected value and a collected value.
///
/// The item value is always the left-hand side: `greater than` with an
/// expected value of `5` is TRUE for an item value of `6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not equal")]
    NotEqual,
    #[serde(rename = "case insensitive equals")]
    CaseInsensitiveEquals,
    #[serde(rename = "case insensitive not equal")]
    CaseInsensitiveNotEqual,
    #[serde(rename = "greater than")]
    GreaterThan,
    #[serde(rename = "less than")]
    LessThan,
    #[serde(rename = "greater than or equal")]
    GreaterThanOrEqual,
    #[serde(rename = "less than or equal")]
    LessThanOrEqual,
    #[serde(rename = "bitwise and")]
    BitwiseAnd,
    #[serde(rename = "bitwise or")]
    BitwiseOr,
    #[serde(rename = "pattern match")]
    PatternMatch,
    #[serde(rename = "subset of")]
    SubsetOf,
    #[serde(rename = "superset of")]
    SupersetOf,
}

impl Operation {
    /// Return all operations as a slice.
    pub fn all() -> &'static [Operation] {
        &[
            Self::Equals,
            Self::NotEqual,
            Self::CaseInsensitiveEquals,
            Self::CaseInsensitiveNotEqual,
            Self::GreaterThan,
            Self::LessThan,
            Self::GreaterThanOrEqual,
            Self::LessThanOrEqual,
            Self::BitwiseAnd,
            Self::BitwiseOr,
            Self::PatternMatch,
            Self::SubsetOf,
            Self::SupersetOf,
        ]
    }

    /// The canonical keyword for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEqual => "not equal",
            Self::CaseInsensitiveEquals => "case insensitive equals",
            Self::CaseInsensitiveNotEqual => "case insensitive not equal",
            Self::GreaterThan => "greater than",
            Self::LessThan => "less than",
            Self::GreaterThanOrEqual => "greater than or equal",
            Self::LessThanOrEqual => "less than or equal",
            Self::BitwiseAnd => "bitwise and",
            Self::BitwiseOr => "bitwise or",
            Self::PatternMatch => "pattern match",
            Self::SubsetOf => "subset of",
            Self::SupersetOf => "superset of",
        }
    }

    /// Set operations compare whole value collections rather than single
    /// values.
    pub fn is_set_operation(self) -> bool {
        matches!(self, Self::SubsetOf | Self::SupersetOf)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKeyword {
                kind: "operation",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_keywords_roundtrip_through_from_str() {
        for &d in Datatype::all() {
            assert_eq!(d.as_str().parse::<Datatype>().unwrap(), d);
        }
    }

    #[test]
    fn operation_keywords_roundtrip_through_from_str() {
        for &op in Operation::all() {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn serde_uses_canonical_spelling() {
        assert_eq!(
            serde_json::to_string(&Datatype::EvrString).unwrap(),
            "\"evr_string\""
        );
        assert_eq!(
            serde_json::to_string(&Operation::GreaterThanOrEqual).unwrap(),
            "\"greater than or equal\""
        );
        let op: Operation = serde_json::from_str("\"pattern match\"").unwrap();
        assert_eq!(op, Operation::PatternMatch);
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let err = "matches".parse::<Operation>().unwrap_err();
        assert!(format!("{err}").contains("matches"));
    }

    #[test]
    fn defaults_follow_document_conventions() {
        assert_eq!(Datatype::default(), Datatype::String);
        assert_eq!(Operation::default(), Operation::Equals);
    }

    #[test]
    fn set_operations_are_classified() {
        assert!(Operation::SubsetOf.is_set_operation());
        assert!(Operation::SupersetOf.is_set_operation());
        assert!(!Operation::Equals.is_set_operation());
    }
}
