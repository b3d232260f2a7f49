//! # Variable Functions
//!
//! Pure value transformations used by the variable resolver. Functions over
//! several operand lists work on the row-major Cartesian product of those
//! lists: the first list varies slowest, so `[a, b] × [1, 2]` yields
//! `a1, a2, b1, b2`.
//!
//! Functions that can fail per value return one `Result` per output value;
//! the resolver keeps the successes and flags the variable ERROR for every
//! failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use oval_core::{ArithmeticOperation, DateTimeFormat};
use regex::Regex;

use crate::comparator::{parse_float, parse_int};
use crate::error::FunctionError;

/// Row-major Cartesian product of operand lists.
///
/// Any empty list makes the product empty; no lists at all yields no rows.
pub fn cartesian(lists: &[Vec<String>]) -> Vec<Vec<&str>> {
    if lists.is_empty() {
        return Vec::new();
    }
    lists.iter().fold(vec![Vec::new()], |rows, list| {
        rows.iter()
            .flat_map(move |row| {
                list.iter().map(move |value| {
                    let mut next = row.clone();
                    next.push(value.as_str());
                    next
                })
            })
            .collect()
    })
}

/// Concatenate one value from each list, for every combination.
pub fn concat(lists: &[Vec<String>]) -> Vec<String> {
    cartesian(lists).into_iter().map(|row| row.concat()).collect()
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn parse(value: &str) -> Result<Self, FunctionError> {
        if let Ok(n) = parse_int(value) {
            return Ok(Self::Int(n));
        }
        parse_float(value)
            .map(Self::Float)
            .map_err(|_| FunctionError::NotANumber(value.to_string()))
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }

    fn render(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

fn apply(operation: ArithmeticOperation, lhs: Number, rhs: Number) -> Result<Number, FunctionError> {
    if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
        let checked = match operation {
            ArithmeticOperation::Add => a.checked_add(b).ok_or(FunctionError::Overflow("add")),
            ArithmeticOperation::Subtract => {
                a.checked_sub(b).ok_or(FunctionError::Overflow("subtract"))
            }
            ArithmeticOperation::Multiply => {
                a.checked_mul(b).ok_or(FunctionError::Overflow("multiply"))
            }
            ArithmeticOperation::Divide => {
                if b == 0 {
                    return Err(FunctionError::DivisionByZero);
                }
                if a % b != 0 {
                    return Ok(Number::Float(a as f64 / b as f64));
                }
                a.checked_div(b).ok_or(FunctionError::Overflow("divide"))
            }
        };
        return checked.map(Number::Int);
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let value = match operation {
        ArithmeticOperation::Add => a + b,
        ArithmeticOperation::Subtract => a - b,
        ArithmeticOperation::Multiply => a * b,
        ArithmeticOperation::Divide => {
            if b == 0.0 {
                return Err(FunctionError::DivisionByZero);
            }
            a / b
        }
    };
    Ok(Number::Float(value))
}

/// Apply `operation` left to right across every combination of operands.
///
/// Integer arithmetic is used while every operand is an integer; an
/// inexact division or a float operand switches that combination to
/// floating point.
pub fn arithmetic(
    operation: ArithmeticOperation,
    lists: &[Vec<String>],
) -> Vec<Result<String, FunctionError>> {
    cartesian(lists)
        .into_iter()
        .map(|row| {
            let mut operands = row.into_iter().map(Number::parse);
            let first = match operands.next() {
                Some(first) => first?,
                None => return Err(FunctionError::NotANumber(String::new())),
            };
            operands
                .try_fold(first, |acc, next| apply(operation, acc, next?))
                .map(Number::render)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// String functions
// ---------------------------------------------------------------------------

/// Character substring with a 1-based `start`; a start below 1 is treated
/// as 1 and a negative `length` takes the rest of the value.
pub fn substring(values: &[String], start: i64, length: i64) -> Vec<Result<String, FunctionError>> {
    let offset = usize::try_from(start.max(1) - 1).unwrap_or(usize::MAX);
    values
        .iter()
        .map(|value| {
            let chars: Vec<char> = value.chars().collect();
            if offset >= chars.len() {
                return Err(FunctionError::SubstringOutOfRange {
                    value: value.clone(),
                    start,
                });
            }
            let rest = &chars[offset..];
            let taken = match usize::try_from(length) {
                Ok(len) => &rest[..len.min(rest.len())],
                Err(_) => rest,
            };
            Ok(taken.iter().collect())
        })
        .collect()
}

/// Split every value on `delimiter`, keeping empty pieces.
///
/// # Errors
///
/// [`FunctionError::EmptyDelimiter`] when `delimiter` is empty.
pub fn split(values: &[String], delimiter: &str) -> Result<Vec<String>, FunctionError> {
    if delimiter.is_empty() {
        return Err(FunctionError::EmptyDelimiter);
    }
    Ok(values
        .iter()
        .flat_map(|v| v.split(delimiter).map(str::to_string))
        .collect())
}

/// Prefix every value with `prefix` unless it already starts with it.
pub fn begin(values: &[String], prefix: &str) -> Vec<String> {
    values
        .iter()
        .map(|v| {
            if v.starts_with(prefix) {
                v.clone()
            } else {
                format!("{prefix}{v}")
            }
        })
        .collect()
}

/// Suffix every value with `suffix` unless it already ends with it.
pub fn end(values: &[String], suffix: &str) -> Vec<String> {
    values
        .iter()
        .map(|v| {
            if v.ends_with(suffix) {
                v.clone()
            } else {
                format!("{v}{suffix}")
            }
        })
        .collect()
}

/// Escape regular-expression metacharacters.
pub fn escape_regex(values: &[String]) -> Vec<String> {
    values.iter().map(|v| regex::escape(v)).collect()
}

/// First capture group of `pattern` (searched, not anchored) in every
/// value. Values that do not match, or whose first group did not
/// participate, produce nothing.
///
/// # Errors
///
/// [`FunctionError::InvalidPattern`] when `pattern` does not compile.
pub fn regex_capture(values: &[String], pattern: &str) -> Result<Vec<String>, FunctionError> {
    let regex = Regex::new(pattern).map_err(|e| FunctionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok(values
        .iter()
        .filter_map(|v| regex.captures(v))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect())
}

/// Distinct values in first-occurrence order.
pub fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Total number of values across all lists, as a single value.
pub fn count(lists: &[Vec<String>]) -> String {
    lists.iter().map(Vec::len).sum::<usize>().to_string()
}

// ---------------------------------------------------------------------------
// Date/time
// ---------------------------------------------------------------------------

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;

fn format_name(format: DateTimeFormat) -> &'static str {
    match format {
        DateTimeFormat::YearMonthDay => "year_month_day",
        DateTimeFormat::MonthDayYear => "month_day_year",
        DateTimeFormat::DayMonthYear => "day_month_year",
        DateTimeFormat::SecondsSinceEpoch => "seconds_since_epoch",
        DateTimeFormat::WinFiletime => "win_filetime",
        DateTimeFormat::CimDatetime => "cim_datetime",
    }
}

fn parse_with_layouts(value: &str, dates: &[&str]) -> Option<NaiveDateTime> {
    const TIMES: [&str; 2] = [" %H:%M:%S", "T%H:%M:%S"];
    for date in dates {
        for time in TIMES {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, &format!("{date}{time}")) {
                return Some(dt);
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(value, date) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a date/time value under `format` as UTC.
///
/// # Errors
///
/// [`FunctionError::InvalidDateTime`] when the value does not fit.
pub fn parse_datetime(value: &str, format: DateTimeFormat) -> Result<DateTime<Utc>, FunctionError> {
    let trimmed = value.trim();
    let parsed = match format {
        DateTimeFormat::YearMonthDay => {
            parse_with_layouts(trimmed, &["%Y%m%d", "%Y/%m/%d", "%Y-%m-%d"])
                .map(|dt| Utc.from_utc_datetime(&dt))
        }
        DateTimeFormat::MonthDayYear => parse_with_layouts(trimmed, &["%m/%d/%Y", "%m-%d-%Y"])
            .map(|dt| Utc.from_utc_datetime(&dt)),
        DateTimeFormat::DayMonthYear => parse_with_layouts(trimmed, &["%d/%m/%Y", "%d-%m-%Y"])
            .map(|dt| Utc.from_utc_datetime(&dt)),
        DateTimeFormat::SecondsSinceEpoch => trimmed
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        DateTimeFormat::WinFiletime => {
            let hex = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .unwrap_or(trimmed);
            i64::from_str_radix(hex, 16)
                .ok()
                .map(|ticks| ticks / 10_000_000 - FILETIME_EPOCH_OFFSET)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        }
        DateTimeFormat::CimDatetime => parse_cim(trimmed),
    };
    parsed.ok_or_else(|| FunctionError::InvalidDateTime {
        value: value.to_string(),
        format: format_name(format),
    })
}

/// `yyyymmddHHMMSS.mmmmmmsUUU`, where `sUUU` is the UTC offset in minutes.
fn parse_cim(value: &str) -> Option<DateTime<Utc>> {
    let local = NaiveDateTime::parse_from_str(value.get(..14)?, "%Y%m%d%H%M%S").ok()?;
    let offset_minutes = match value.get(21..25) {
        Some(offset) => offset.parse::<i64>().ok()?,
        None => 0,
    };
    let utc = local.checked_sub_signed(chrono::Duration::minutes(offset_minutes))?;
    Some(Utc.from_utc_datetime(&utc))
}

/// Seconds between date/time values.
///
/// With one list, each value is subtracted from `reference`. With two
/// lists, every combination yields `second - first`.
pub fn time_difference(
    format_1: DateTimeFormat,
    format_2: DateTimeFormat,
    lists: &[Vec<String>],
    reference: DateTime<Utc>,
) -> Vec<Result<String, FunctionError>> {
    match lists {
        [only] => only
            .iter()
            .map(|v| {
                let t = parse_datetime(v, format_1)?;
                Ok((reference - t).num_seconds().to_string())
            })
            .collect(),
        [_, _] => cartesian(lists)
            .into_iter()
            .map(|row| {
                let t1 = parse_datetime(row[0], format_1)?;
                let t2 = parse_datetime(row[1], format_2)?;
                Ok((t2 - t1).num_seconds().to_string())
            })
            .collect(),
        other => vec![Err(FunctionError::TimeDifferenceArity(other.len()))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn oks(results: Vec<Result<String, FunctionError>>) -> Vec<String> {
        results.into_iter().map(Result::unwrap).collect()
    }

    // ── cartesian / concat ──────────────────────────────────────────

    #[test]
    fn concat_is_row_major() {
        let lists = vec![strings(&["a", "b"]), strings(&["1", "2"])];
        assert_eq!(concat(&lists), strings(&["a1", "a2", "b1", "b2"]));
    }

    #[test]
    fn empty_operand_empties_product() {
        let lists = vec![strings(&["a"]), Vec::new()];
        assert!(concat(&lists).is_empty());
        assert!(cartesian(&[]).is_empty());
    }

    // ── arithmetic ──────────────────────────────────────────────────

    #[test]
    fn integer_arithmetic_stays_integral() {
        let lists = vec![strings(&["10", "20"]), strings(&["2"])];
        assert_eq!(oks(arithmetic(ArithmeticOperation::Add, &lists)), strings(&["12", "22"]));
        assert_eq!(oks(arithmetic(ArithmeticOperation::Divide, &lists)), strings(&["5", "10"]));
    }

    #[test]
    fn inexact_division_and_float_operands_use_float() {
        let lists = vec![strings(&["7"]), strings(&["2"])];
        assert_eq!(oks(arithmetic(ArithmeticOperation::Divide, &lists)), strings(&["3.5"]));
        let lists = vec![strings(&["1.5"]), strings(&["2"])];
        assert_eq!(oks(arithmetic(ArithmeticOperation::Multiply, &lists)), strings(&["3"]));
    }

    #[test]
    fn arithmetic_failures_are_per_value() {
        let lists = vec![strings(&["4", "x"]), strings(&["0", "2"])];
        let results = arithmetic(ArithmeticOperation::Divide, &lists);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Err(FunctionError::DivisionByZero));
        assert_eq!(results[1], Ok("2".to_string()));
        assert_eq!(results[2], Err(FunctionError::NotANumber("x".to_string())));

        let overflow = vec![strings(&[&i64::MAX.to_string()]), strings(&["1"])];
        assert_eq!(
            arithmetic(ArithmeticOperation::Add, &overflow)[0],
            Err(FunctionError::Overflow("add"))
        );
    }

    // ── string functions ────────────────────────────────────────────

    #[test]
    fn substring_is_one_based() {
        let values = strings(&["abcdef"]);
        assert_eq!(oks(substring(&values, 2, 3)), strings(&["bcd"]));
        assert_eq!(oks(substring(&values, 4, -1)), strings(&["def"]));
        assert_eq!(oks(substring(&values, 0, 2)), strings(&["ab"]));
        assert_eq!(oks(substring(&values, 5, 99)), strings(&["ef"]));
        assert!(substring(&values, 7, 1)[0].is_err());
    }

    #[test]
    fn split_keeps_empty_pieces() {
        let values = strings(&["a,,b", "c"]);
        assert_eq!(split(&values, ",").unwrap(), strings(&["a", "", "b", "c"]));
        assert_eq!(split(&values, ""), Err(FunctionError::EmptyDelimiter));
    }

    #[test]
    fn begin_and_end_are_idempotent() {
        let values = strings(&["/etc", "etc"]);
        assert_eq!(begin(&values, "/"), strings(&["/etc", "/etc"]));
        assert_eq!(end(&values, "/"), strings(&["/etc/", "etc/"]));
    }

    #[test]
    fn escape_regex_escapes_metacharacters() {
        let escaped = escape_regex(&strings(&["a.b*c"]));
        assert_eq!(escaped, strings(&[r"a\.b\*c"]));
    }

    #[test]
    fn regex_capture_drops_non_matching() {
        let values = strings(&["version=1.2", "nothing", "version=3"]);
        assert_eq!(
            regex_capture(&values, r"version=(\S+)").unwrap(),
            strings(&["1.2", "3"])
        );
        assert!(regex_capture(&values, "(").is_err());
    }

    #[test]
    fn unique_and_count() {
        assert_eq!(unique(strings(&["a", "b", "a"])), strings(&["a", "b"]));
        assert_eq!(count(&[strings(&["a", "b"]), strings(&["c"])]), "3");
    }

    // ── time difference ─────────────────────────────────────────────

    #[test]
    fn parses_every_format() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_datetime("20240301", DateTimeFormat::YearMonthDay).unwrap(), expected);
        assert_eq!(parse_datetime("2024-03-01", DateTimeFormat::YearMonthDay).unwrap(), expected);
        assert_eq!(parse_datetime("03/01/2024", DateTimeFormat::MonthDayYear).unwrap(), expected);
        assert_eq!(parse_datetime("01-03-2024", DateTimeFormat::DayMonthYear).unwrap(), expected);
        assert_eq!(
            parse_datetime("1709251200", DateTimeFormat::SecondsSinceEpoch).unwrap(),
            expected
        );
        assert_eq!(
            parse_datetime("20240301020000.000000+120", DateTimeFormat::CimDatetime).unwrap(),
            expected
        );
        let with_time = parse_datetime("2024/03/01 12:30:00", DateTimeFormat::YearMonthDay).unwrap();
        assert_eq!(with_time, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn win_filetime_converts_from_1601() {
        // 1970-01-01T00:00:00Z expressed in 100ns ticks since 1601.
        let ticks = format!("{:x}", FILETIME_EPOCH_OFFSET * 10_000_000);
        let parsed = parse_datetime(&ticks, DateTimeFormat::WinFiletime).unwrap();
        assert_eq!(parsed.timestamp(), 0);
    }

    #[test]
    fn time_difference_one_and_two_operands() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let one = vec![strings(&["20240301"])];
        assert_eq!(
            oks(time_difference(
                DateTimeFormat::YearMonthDay,
                DateTimeFormat::YearMonthDay,
                &one,
                reference
            )),
            strings(&["86400"])
        );
        let two = vec![strings(&["0"]), strings(&["60", "120"])];
        assert_eq!(
            oks(time_difference(
                DateTimeFormat::SecondsSinceEpoch,
                DateTimeFormat::SecondsSinceEpoch,
                &two,
                reference
            )),
            strings(&["60", "120"])
        );
        assert!(time_difference(
            DateTimeFormat::YearMonthDay,
            DateTimeFormat::YearMonthDay,
            &[],
            reference
        )[0]
            .is_err());
    }

    #[test]
    fn invalid_datetime_names_format() {
        let err = parse_datetime("yesterday", DateTimeFormat::MonthDayYear).unwrap_err();
        assert!(err.to_string().contains("month_day_year"));
    }
}
