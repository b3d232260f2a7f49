//! # Datatype Comparator
//!
//! Pure functions comparing two string-encoded values under a declared
//! [`Datatype`]. The item value is always the left-hand side.
//!
//! Dispatch is an exhaustive `match` over the datatype; each arm lists the
//! operations it supports and rejects the rest with
//! [`ComparisonError::UnsupportedOperation`].
//!
//! | datatype | operations |
//! |----------|------------|
//! | `string` | equality, case-insensitive equality |
//! | `int` | equality, ordering, bitwise |
//! | `float`, version types, `evr_string` | equality, ordering |
//! | `boolean`, `binary`, `record` | equality |
//!
//! `pattern match` applies to every datatype and uses full-match semantics.
//! `subset of` / `superset of` are answered by [`compare_sets`].
//! [`PatternCache`] keeps compiled patterns for the length of a pass.

use std::cmp::Ordering;
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use oval_core::{Datatype, Operation};
use regex::Regex;

use crate::error::ComparisonError;

/// Compare `item_value` against `expected` under `datatype`.
///
/// # Errors
///
/// - [`ComparisonError::TypeMismatch`] when either value does not parse.
/// - [`ComparisonError::InvalidPattern`] when a `pattern match` expression
///   does not compile.
/// - [`ComparisonError::UnsupportedOperation`] for an illegal
///   datatype/operation pair.
pub fn compare(
    datatype: Datatype,
    item_value: &str,
    expected: &str,
    operation: Operation,
) -> Result<bool, ComparisonError> {
    match operation {
        Operation::PatternMatch => return pattern_match(item_value, expected),
        Operation::SubsetOf | Operation::SupersetOf => {
            return compare_sets(
                datatype,
                &[item_value.to_string()],
                &[expected.to_string()],
                operation,
            )
        }
        _ => {}
    }

    let unsupported = || ComparisonError::UnsupportedOperation {
        datatype,
        operation,
    };

    match datatype {
        Datatype::String => match operation {
            Operation::Equals => Ok(item_value == expected),
            Operation::NotEqual => Ok(item_value != expected),
            Operation::CaseInsensitiveEquals => Ok(fold(item_value) == fold(expected)),
            Operation::CaseInsensitiveNotEqual => Ok(fold(item_value) != fold(expected)),
            _ => Err(unsupported()),
        },
        Datatype::Int => {
            let item = parse_int(item_value)?;
            let exp = parse_int(expected)?;
            match operation {
                Operation::BitwiseAnd => Ok((item & exp) == exp),
                Operation::BitwiseOr => Ok((item | exp) == exp),
                _ => ordering_result(item.cmp(&exp), operation).ok_or_else(unsupported),
            }
        }
        Datatype::Float => {
            let item = parse_float(item_value)?;
            let exp = parse_float(expected)?;
            match item.partial_cmp(&exp) {
                Some(ord) => ordering_result(ord, operation).ok_or_else(unsupported),
                // NaN is unordered: only "not equal" holds.
                None => match operation {
                    Operation::NotEqual => Ok(true),
                    _ if ordering_result(Ordering::Equal, operation).is_some() => Ok(false),
                    _ => Err(unsupported()),
                },
            }
        }
        Datatype::Boolean => {
            let item = parse_boolean(item_value)?;
            let exp = parse_boolean(expected)?;
            equality_result(item == exp, operation).ok_or_else(unsupported)
        }
        Datatype::Version | Datatype::FilesetRevision | Datatype::IosVersion => {
            let item = VersionSegments::parse(datatype, item_value)?;
            let exp = VersionSegments::parse(datatype, expected)?;
            ordering_result(item.compare(&exp), operation).ok_or_else(unsupported)
        }
        Datatype::EvrString => {
            let item = Evr::parse(item_value)?;
            let exp = Evr::parse(expected)?;
            ordering_result(item.compare(&exp), operation).ok_or_else(unsupported)
        }
        Datatype::Binary => {
            let item = decode_binary(item_value)?;
            let exp = decode_binary(expected)?;
            equality_result(item == exp, operation).ok_or_else(unsupported)
        }
        Datatype::Record => equality_result(item_value == expected, operation).ok_or_else(unsupported),
    }
}

/// Compare two value collections with `subset of` / `superset of`.
///
/// Element membership uses datatype equality, so `"0x10"` and `"16"` are
/// the same `int` element. Every element of both sides is parsed, so a
/// malformed element is a [`ComparisonError::TypeMismatch`] even if it
/// would not affect the answer.
///
/// # Errors
///
/// [`ComparisonError::UnsupportedOperation`] for any other operation, plus
/// any error raised by element equality.
pub fn compare_sets(
    datatype: Datatype,
    item_values: &[String],
    expected: &[String],
    operation: Operation,
) -> Result<bool, ComparisonError> {
    let (inner, outer) = match operation {
        Operation::SubsetOf => (item_values, expected),
        Operation::SupersetOf => (expected, item_values),
        _ => {
            return Err(ComparisonError::UnsupportedOperation {
                datatype,
                operation,
            })
        }
    };
    let mut contained = true;
    for needle in inner {
        let mut found = false;
        for candidate in outer {
            found |= compare(datatype, needle, candidate, Operation::Equals)?;
        }
        contained &= found;
    }
    Ok(contained)
}

/// Full-match regular expression test.
///
/// The pattern must compile on its own before it is anchored, so a pattern
/// such as `a)|(b` cannot close the anchoring group early.
///
/// # Errors
///
/// [`ComparisonError::InvalidPattern`] when `pattern` does not compile.
pub fn pattern_match(value: &str, pattern: &str) -> Result<bool, ComparisonError> {
    Ok(compile_pattern(pattern)?.is_match(value))
}

fn compile_pattern(pattern: &str) -> Result<Regex, ComparisonError> {
    let invalid = |e: regex::Error| ComparisonError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    };
    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!(r"\A(?:{pattern})\z")).map_err(invalid)
}

// ---------------------------------------------------------------------------
// Pattern cache
// ---------------------------------------------------------------------------

/// Compiled `pattern match` expressions, keyed by source pattern.
///
/// One cache lives for one evaluation pass. A pattern that fails to compile
/// is cached as its error, so it is diagnosed once and reported the same way
/// on every later use.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Result<Regex, ComparisonError>>,
}

impl PatternCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`compare`], answering `pattern match` from the cache.
    ///
    /// # Errors
    ///
    /// As [`compare`].
    pub fn compare(
        &mut self,
        datatype: Datatype,
        item_value: &str,
        expected: &str,
        operation: Operation,
    ) -> Result<bool, ComparisonError> {
        match operation {
            Operation::PatternMatch => self.is_match(item_value, expected),
            _ => compare(datatype, item_value, expected, operation),
        }
    }

    /// [`pattern_match`] with the compiled expression reused across calls.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidPattern`] when `pattern` does not compile.
    pub fn is_match(&mut self, value: &str, pattern: &str) -> Result<bool, ComparisonError> {
        if let Some(compiled) = self.compiled.get(pattern) {
            return compiled
                .as_ref()
                .map(|regex| regex.is_match(value))
                .map_err(Clone::clone);
        }
        let compiled = compile_pattern(pattern);
        let matched = compiled
            .as_ref()
            .map(|regex| regex.is_match(value))
            .map_err(Clone::clone);
        self.compiled.insert(pattern.to_string(), compiled);
        matched
    }

    /// Number of distinct patterns seen.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True when no pattern has been seen.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Result helpers
// ---------------------------------------------------------------------------

fn ordering_result(ord: Ordering, operation: Operation) -> Option<bool> {
    match operation {
        Operation::Equals => Some(ord == Ordering::Equal),
        Operation::NotEqual => Some(ord != Ordering::Equal),
        Operation::GreaterThan => Some(ord == Ordering::Greater),
        Operation::LessThan => Some(ord == Ordering::Less),
        Operation::GreaterThanOrEqual => Some(ord != Ordering::Less),
        Operation::LessThanOrEqual => Some(ord != Ordering::Greater),
        _ => None,
    }
}

fn equality_result(equal: bool, operation: Operation) -> Option<bool> {
    match operation {
        Operation::Equals => Some(equal),
        Operation::NotEqual => Some(!equal),
        _ => None,
    }
}

fn fold(value: &str) -> String {
    value.to_lowercase()
}

fn mismatch(datatype: Datatype, value: &str) -> ComparisonError {
    ComparisonError::TypeMismatch {
        datatype,
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scalar parsing
// ---------------------------------------------------------------------------

/// Parse an `int` value: optional sign, decimal digits or `0x` hex digits.
pub(crate) fn parse_int(value: &str) -> Result<i64, ComparisonError> {
    let s = value.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i128::from_str_radix(hex, 16).ok()
        }
        Some(_) => None,
        None if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) => {
            body.parse::<i128>().ok()
        }
        None => None,
    };
    magnitude
        .map(|m| if negative { -m } else { m })
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| mismatch(Datatype::Int, value))
}

/// Parse a `float` value.
pub(crate) fn parse_float(value: &str) -> Result<f64, ComparisonError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| mismatch(Datatype::Float, value))
}

fn parse_boolean(value: &str) -> Result<bool, ComparisonError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(mismatch(Datatype::Boolean, value)),
    }
}

fn decode_binary(value: &str) -> Result<Vec<u8>, ComparisonError> {
    STANDARD
        .decode(value.trim())
        .map_err(|_| mismatch(Datatype::Binary, value))
}

// ---------------------------------------------------------------------------
// Version segments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Digit run with leading zeros stripped.
    Number(&'a str),
    Text(&'a str),
}

impl Segment<'_> {
    const ZERO: Segment<'static> = Segment::Number("");

    fn compare(&self, other: &Segment<'_>) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => compare_digits(a, b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        }
    }
}

/// Compare two digit strings (leading zeros already stripped) numerically
/// without overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_zeros(digits: &str) -> &str {
    digits.trim_start_matches('0')
}

/// A version split into maximal digit and letter runs; punctuation
/// separates runs and is otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionSegments<'a>(Vec<Segment<'a>>);

impl<'a> VersionSegments<'a> {
    fn parse(datatype: Datatype, value: &'a str) -> Result<Self, ComparisonError> {
        let mut segments = Vec::new();
        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let start = i;
            if bytes[i].is_ascii_digit() {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                segments.push(Segment::Number(strip_zeros(&value[start..i])));
            } else if bytes[i].is_ascii_alphabetic() {
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                segments.push(Segment::Text(&value[start..i]));
            } else {
                i += 1;
            }
        }
        let valid = match segments.first() {
            None => false,
            Some(Segment::Number(_)) => true,
            // HP-UX fileset revisions may open with a release letter.
            Some(Segment::Text(_)) => datatype == Datatype::FilesetRevision,
        };
        if valid {
            Ok(Self(segments))
        } else {
            Err(mismatch(datatype, value))
        }
    }

    /// Component-wise comparison; the shorter side is padded with zeros.
    fn compare(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).unwrap_or(&Segment::ZERO);
                let b = other.0.get(i).unwrap_or(&Segment::ZERO);
                a.compare(b)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

// ---------------------------------------------------------------------------
// EVR strings
// ---------------------------------------------------------------------------

/// `[epoch:]version[-release]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Evr<'a> {
    epoch: &'a str,
    version: &'a str,
    release: &'a str,
}

impl<'a> Evr<'a> {
    fn parse(value: &'a str) -> Result<Self, ComparisonError> {
        let value = value.trim();
        let (epoch, rest) = match value.split_once(':') {
            Some((epoch, rest)) => {
                if !epoch.is_empty() && !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(mismatch(Datatype::EvrString, value));
                }
                (strip_zeros(epoch), rest)
            }
            None => ("", value),
        };
        let (version, release) = rest.rsplit_once('-').unwrap_or((rest, ""));
        if version.is_empty() {
            return Err(mismatch(Datatype::EvrString, value));
        }
        Ok(Self {
            epoch,
            version,
            release,
        })
    }

    fn compare(&self, other: &Self) -> Ordering {
        compare_digits(self.epoch, other.epoch)
            .then_with(|| rpm_vercmp(self.version, other.version))
            .then_with(|| rpm_vercmp(self.release, other.release))
    }
}

/// RPM segment comparison: digit runs beat letter runs, `~` sorts before
/// anything (including the end of the string), and when all shared
/// segments are equal the side with more segments is newer.
fn rpm_vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);
    let separator = |c: u8| !c.is_ascii_alphanumeric() && c != b'~';

    while i < a.len() || j < b.len() {
        while i < a.len() && separator(a[i]) {
            i += 1;
        }
        while j < b.len() && separator(b[j]) {
            j += 1;
        }

        let a_tilde = a.get(i) == Some(&b'~');
        let b_tilde = b.get(j) == Some(&b'~');
        if a_tilde || b_tilde {
            if !a_tilde {
                return Ordering::Greater;
            }
            if !b_tilde {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if i >= a.len() || j >= b.len() {
            break;
        }

        let numeric = a[i].is_ascii_digit();
        let run = |s: &[u8], mut k: usize| {
            while k < s.len() && s[k].is_ascii_digit() == numeric && s[k].is_ascii_alphanumeric() {
                k += 1;
            }
            k
        };
        let (a_end, b_end) = (run(a, i), run(b, j));
        if b_end == j {
            // Segment types differ: the numeric side is newer.
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let a_seg = String::from_utf8_lossy(&a[i..a_end]);
        let b_seg = String::from_utf8_lossy(&b[j..b_end]);
        let ord = if numeric {
            compare_digits(strip_zeros(&a_seg), strip_zeros(&b_seg))
        } else {
            a_seg.cmp(&b_seg)
        };
        if ord != Ordering::Equal {
            return ord;
        }
        i = a_end;
        j = b_end;
    }

    match (i >= a.len(), j >= b.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}
