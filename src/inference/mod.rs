//! Value type inference for raw CSV columns.
//!
//! Every chunk read from the source file starts out as text. This module
//! decides, per column and per chunk, whether that text is integers,
//! floats, or untyped ("object") text, and separately whether an object
//! column is entirely made of timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::batch::{Column, Value};
use crate::schema::types::Dtype;

/// Cell contents treated as absent values unless configured otherwise.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan",
    "null",
];

/// Detect integers.
static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d+$").unwrap());

/// Detect floats. Excludes `inf` and `nan`, which Rust's parser would accept.
static FLOAT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?$").unwrap());

/// Timestamp layouts tried in order. `%.f` also matches a missing fraction.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only layouts; parsed values land on midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Check if a string matches the integer pattern.
pub fn is_integer_string(s: &str) -> bool {
    INTEGER_REGEX.is_match(s)
}

/// Check if a string matches the float pattern.
pub fn is_float_string(s: &str) -> bool {
    FLOAT_REGEX.is_match(s)
}

/// Parse an integer cell, tolerating surrounding whitespace.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if is_integer_string(s) {
        s.parse().ok()
    } else {
        None
    }
}

/// Parse a float cell, tolerating surrounding whitespace.
pub fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if is_float_string(s) {
        s.parse().ok()
    } else {
        None
    }
}

/// Parse a timestamp cell.
///
/// Accepts ISO-8601 style timestamps (with `T` or space, optional
/// fraction), US month-first timestamps with 24h or AM/PM clocks, plain
/// dates, and RFC 3339 timestamps with an offset, which are converted to
/// UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Check whether a cell is one of the configured missing-value tokens.
pub fn is_missing<S: AsRef<str>>(cell: &str, na_values: &[S]) -> bool {
    na_values.iter().any(|na| na.as_ref() == cell)
}

/// Infer the dtype of one chunk of raw cells (`None` = absent).
///
/// Integers win if every present cell is an integer that fits in 64 bits,
/// then floats; everything else, including a column with no present cells,
/// is `Object`.
pub fn infer_dtype<S: AsRef<str>>(cells: &[Option<S>]) -> Dtype {
    let mut present = cells
        .iter()
        .filter_map(|cell| cell.as_ref().map(AsRef::<str>::as_ref))
        .peekable();
    if present.peek().is_none() {
        return Dtype::Object;
    }

    let mut all_int = true;
    let mut all_float = true;
    for cell in present {
        if all_int && parse_int(cell).is_none() {
            all_int = false;
        }
        if parse_float(cell).is_none() {
            all_float = false;
            break;
        }
    }

    if all_int && all_float {
        Dtype::Int64
    } else if all_float {
        Dtype::Float64
    } else {
        Dtype::Object
    }
}

/// Build a typed column from raw cells using the inferred dtype.
pub fn typed_column(name: &str, cells: Vec<Option<String>>) -> Column {
    let dtype = infer_dtype(&cells);
    let values = cells
        .iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(text) => match dtype {
                Dtype::Int64 => parse_int(text).map(Value::Int).unwrap_or(Value::Null),
                Dtype::Float64 => parse_float(text).map(Value::Float).unwrap_or(Value::Null),
                _ => Value::Str(text.clone()),
            },
        })
        .collect();
    Column::new(name, dtype, values).with_source(cells)
}

/// Try to turn an object column into a timestamp column.
///
/// The column is converted only if it has at least one present value and
/// every present value parses as a timestamp. Otherwise it is left exactly
/// as it was and `false` is returned; failures are never reported.
pub fn sniff_timestamps(column: &mut Column) -> bool {
    if column.dtype != Dtype::Object {
        return false;
    }

    let mut parsed = Vec::with_capacity(column.values.len());
    let mut seen_value = false;
    for value in &column.values {
        match value {
            Value::Null => parsed.push(Value::Null),
            Value::Str(s) => match parse_timestamp(s) {
                Some(ts) => {
                    seen_value = true;
                    parsed.push(Value::DateTime(ts));
                }
                None => return false,
            },
            Value::DateTime(ts) => {
                seen_value = true;
                parsed.push(Value::DateTime(*ts));
            }
            Value::Int(_) | Value::Float(_) => return false,
        }
    }

    if !seen_value {
        return false;
    }

    column.values = parsed;
    column.dtype = Dtype::DateTime;
    true
}
