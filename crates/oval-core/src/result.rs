//! # Result Lattice
//!
//! Defines [`ResultValue`] and the two combinators every layer of the
//! evaluator is built on:
//!
//! - [`combine_flags`]: combines results under a boolean [`Operator`]
//!   (criteria trees, state entities, variable flags).
//! - [`combine_by_check`] / [`combine_by_existence`]: combines results under
//!   a quantifier ([`Check`] / [`ExistenceCheck`]) when a selector or a test
//!   is matched against a *set* of items.
//!
//! ## Precedence
//!
//! ```text
//! ERROR > UNKNOWN > NOT_EVALUATED > NOT_APPLICABLE > TRUE/FALSE
//! ```
//!
//! The severity order is overridden by short-circuit rules: OR with any
//! TRUE is TRUE even alongside ERROR, and AND with any FALSE is FALSE even
//! alongside UNKNOWN (but not alongside ERROR). NOT_APPLICABLE members are
//! ignored unless every member is NOT_APPLICABLE.
//!
//! Negation only swaps TRUE and FALSE.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ResultValue
// ---------------------------------------------------------------------------

/// The outcome of evaluating any node: an entity comparison, an item, a
/// test, a criteria node, or a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    /// The assessed condition holds.
    True,
    /// The assessed condition does not hold.
    False,
    /// Evaluation failed (type error, collection error, ...).
    Error,
    /// Not enough information to decide.
    Unknown,
    /// The node was intentionally not evaluated.
    NotEvaluated,
    /// The node does not apply to the assessed system.
    NotApplicable,
}

impl ResultValue {
    /// Every result value, in severity order (most severe first).
    pub fn all() -> &'static [ResultValue] {
        &[
            Self::Error,
            Self::Unknown,
            Self::NotEvaluated,
            Self::NotApplicable,
            Self::True,
            Self::False,
        ]
    }

    /// Convert a boolean into TRUE/FALSE.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }

    /// Swap TRUE and FALSE; every other value passes through unchanged.
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            other => other,
        }
    }

    /// Apply [`negate`](Self::negate) when `flag` is set.
    pub fn negate_if(self, flag: bool) -> Self {
        if flag {
            self.negate()
        } else {
            self
        }
    }

    /// TRUE or FALSE, i.e. a definitive answer.
    pub fn is_definitive(self) -> bool {
        matches!(self, Self::True | Self::False)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "true",
            Self::False => "false",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::NotEvaluated => "not evaluated",
            Self::NotApplicable => "not applicable",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Operators and quantifiers
// ---------------------------------------------------------------------------

/// Boolean connective of a criteria node, a state, or a test's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Every member must be TRUE.
    #[default]
    And,
    /// At least one member must be TRUE.
    Or,
    /// Exactly one member must be TRUE.
    One,
    /// An odd number of members must be TRUE.
    Xor,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::One => "ONE",
            Self::Xor => "XOR",
        };
        f.write_str(s)
    }
}

/// How many members of a set must satisfy a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Check {
    /// Every member (and at least one member) must be TRUE.
    #[default]
    #[serde(rename = "all")]
    All,
    /// At least one member must be TRUE.
    #[serde(rename = "at least one")]
    AtLeastOne,
    /// No member may be TRUE.
    #[serde(rename = "none satisfy")]
    NoneSatisfy,
    /// Exactly one member must be TRUE.
    #[serde(rename = "only one")]
    OnlyOne,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::AtLeastOne => "at least one",
            Self::NoneSatisfy => "none satisfy",
            Self::OnlyOne => "only one",
        };
        f.write_str(s)
    }
}

/// How many items must exist for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistenceCheck {
    /// Every member must exist, and there must be at least one.
    AllExist,
    /// Zero or more members may exist.
    AnyExist,
    /// At least one member must exist.
    AtLeastOneExists,
    /// No member may exist.
    NoneExist,
    /// Exactly one member must exist.
    OnlyOneExists,
}

impl ExistenceCheck {
    /// Whether an empty member set satisfies this check.
    pub fn permits_none(self) -> bool {
        matches!(self, Self::AnyExist | Self::NoneExist)
    }
}

impl fmt::Display for ExistenceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllExist => "all_exist",
            Self::AnyExist => "any_exist",
            Self::AtLeastOneExists => "at_least_one_exists",
            Self::NoneExist => "none_exist",
            Self::OnlyOneExists => "only_one_exists",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ResultCounts
// ---------------------------------------------------------------------------

/// Per-value tally of a result list; every combinator works from counts so
/// that member order never affects the outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultCounts {
    pub true_count: usize,
    pub false_count: usize,
    pub error_count: usize,
    pub unknown_count: usize,
    pub not_evaluated_count: usize,
    pub not_applicable_count: usize,
}

impl ResultCounts {
    /// Tally a result list.
    pub fn tally(results: &[ResultValue]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result {
                ResultValue::True => counts.true_count += 1,
                ResultValue::False => counts.false_count += 1,
                ResultValue::Error => counts.error_count += 1,
                ResultValue::Unknown => counts.unknown_count += 1,
                ResultValue::NotEvaluated => counts.not_evaluated_count += 1,
                ResultValue::NotApplicable => counts.not_applicable_count += 1,
            }
        }
        counts
    }

    /// Number of members that are not NOT_APPLICABLE.
    pub fn assessed(&self) -> usize {
        self.true_count
            + self.false_count
            + self.error_count
            + self.unknown_count
            + self.not_evaluated_count
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Combine results under a boolean connective.
///
/// Empty input, or input made only of NOT_APPLICABLE members, yields
/// NOT_APPLICABLE.
pub fn combine_flags(results: &[ResultValue], operator: Operator) -> ResultValue {
    let counts = ResultCounts::tally(results);
    if counts.assessed() == 0 {
        return ResultValue::NotApplicable;
    }
    if operator == Operator::Or && counts.true_count > 0 {
        return ResultValue::True;
    }
    if counts.error_count > 0 {
        return ResultValue::Error;
    }
    if operator == Operator::And && counts.false_count > 0 {
        return ResultValue::False;
    }
    if counts.unknown_count > 0 {
        return ResultValue::Unknown;
    }
    if counts.not_evaluated_count > 0 {
        return ResultValue::NotEvaluated;
    }
    match operator {
        Operator::And => ResultValue::True,
        Operator::Or => ResultValue::False,
        Operator::One => ResultValue::from_bool(counts.true_count == 1),
        Operator::Xor => ResultValue::from_bool(counts.true_count % 2 == 1),
    }
}

/// Combine per-member results under a [`Check`] quantifier.
///
/// An empty set is TRUE only under `none satisfy`; in particular "all of
/// zero members" is FALSE, not vacuously TRUE.
pub fn combine_by_check(results: &[ResultValue], check: Check) -> ResultValue {
    if results.is_empty() {
        return ResultValue::from_bool(check == Check::NoneSatisfy);
    }
    match check {
        Check::All => combine_flags(results, Operator::And),
        Check::AtLeastOne => combine_flags(results, Operator::Or),
        Check::OnlyOne => {
            let counts = ResultCounts::tally(results);
            if counts.assessed() == 0 {
                ResultValue::NotApplicable
            } else if counts.error_count > 0 {
                ResultValue::Error
            } else if counts.true_count > 1 {
                ResultValue::False
            } else if counts.unknown_count > 0 {
                ResultValue::Unknown
            } else if counts.not_evaluated_count > 0 {
                ResultValue::NotEvaluated
            } else {
                ResultValue::from_bool(counts.true_count == 1)
            }
        }
        Check::NoneSatisfy => {
            let counts = ResultCounts::tally(results);
            if counts.assessed() == 0 {
                ResultValue::NotApplicable
            } else if counts.error_count > 0 {
                ResultValue::Error
            } else if counts.true_count > 0 {
                ResultValue::False
            } else if counts.unknown_count > 0 {
                ResultValue::Unknown
            } else if counts.not_evaluated_count > 0 {
                ResultValue::NotEvaluated
            } else {
                ResultValue::True
            }
        }
    }
}

/// Combine per-member results under an [`ExistenceCheck`].
///
/// The four quantified checks share the semantics of their [`Check`]
/// counterparts; `any_exist` is TRUE unless a member is ERROR.
pub fn combine_by_existence(results: &[ResultValue], existence: ExistenceCheck) -> ResultValue {
    match existence {
        ExistenceCheck::AllExist => combine_by_check(results, Check::All),
        ExistenceCheck::AtLeastOneExists => combine_by_check(results, Check::AtLeastOne),
        ExistenceCheck::NoneExist => combine_by_check(results, Check::NoneSatisfy),
        ExistenceCheck::OnlyOneExists => combine_by_check(results, Check::OnlyOne),
        ExistenceCheck::AnyExist => {
            if results.contains(&ResultValue::Error) {
                ResultValue::Error
            } else {
                ResultValue::True
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
