//! Cell-level coercion. Never fails: every cell is either a value, missing,
//! or invalid, and the caller decides how to count and impute.

use chrono::{NaiveDate, NaiveDateTime};

/// Outcome of coercing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<T> {
    /// Blank or a null sentinel.
    Missing,
    /// Present but unparsable.
    Invalid,
    Value(T),
}

impl<T> Cell<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Cell::Invalid)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Cell::Value(_))
    }
}

const NULL_SENTINELS: &[&str] = &["nan", "null", "none", "n/a", "na", "-"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Largest magnitude accepted for a count cell. Keeps i64 sums over any
/// realistic row count from overflowing.
pub const MAX_INTEGER_MAGNITUDE: i64 = 1_000_000_000;

fn is_null(raw: &str) -> bool {
    raw.is_empty() || NULL_SENTINELS.iter().any(|s| raw.eq_ignore_ascii_case(s))
}

/// Parse a float, tolerating thousands separators. Non-finite values are invalid.
pub fn parse_number(raw: &str) -> Cell<f64> {
    let raw = raw.trim();
    if is_null(raw) {
        return Cell::Missing;
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(value) if value.is_finite() => Cell::Value(value),
        _ => Cell::Invalid,
    }
}

/// Parse a whole number. `"3.0"` is accepted, `"3.5"` is not, and neither is
/// anything beyond [`MAX_INTEGER_MAGNITUDE`].
pub fn parse_integer(raw: &str) -> Cell<i64> {
    match parse_number(raw) {
        Cell::Value(value)
            if value.fract() == 0.0 && value.abs() <= MAX_INTEGER_MAGNITUDE as f64 =>
        {
            Cell::Value(value as i64)
        }
        Cell::Value(_) | Cell::Invalid => Cell::Invalid,
        Cell::Missing => Cell::Missing,
    }
}

/// Parse a timestamp; a bare date reads as midnight.
pub fn parse_timestamp(raw: &str) -> Cell<NaiveDateTime> {
    let raw = raw.trim();
    if is_null(raw) {
        return Cell::Missing;
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Cell::Value(ts);
        }
    }
    match parse_date(raw) {
        Cell::Value(date) => Cell::Value(date.and_time(chrono::NaiveTime::MIN)),
        _ => Cell::Invalid,
    }
}

/// Parse a date; a full timestamp is truncated to its date.
pub fn parse_date(raw: &str) -> Cell<NaiveDate> {
    let raw = raw.trim();
    if is_null(raw) {
        return Cell::Missing;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Cell::Value(date);
        }
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Cell::Value(ts.date());
        }
    }
    Cell::Invalid
}

pub fn parse_bool(raw: &str) -> Cell<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Cell::Missing;
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" => Cell::Value(true),
        "false" | "0" | "no" | "n" | "f" => Cell::Value(false),
        other if is_null(other) => Cell::Missing,
        _ => Cell::Invalid,
    }
}

/// Collapse whitespace and capitalize each word.
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
