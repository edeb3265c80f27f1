//! Column classification into numeric, datetime, categorical or text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::table::CellValue;
use crate::types::ClassificationTag;
use crate::utils::is_numeric_string;

// Date pattern regexes - compiled once at startup
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}").expect("Invalid regex: MM-DD-YYYY"),
    ]
});

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Classify a column from its cells.
///
/// Blank cells are ignored. A column with nothing left is text. Otherwise it
/// is numeric if every value parses as a number, datetime if every value
/// parses as a date or timestamp, and else categorical when
/// `distinct / present < categorical_ratio_threshold`, text otherwise.
pub fn classify(cells: &[CellValue], categorical_ratio_threshold: f64) -> ClassificationTag {
    let present: Vec<&CellValue> = cells.iter().filter(|c| !c.is_blank()).collect();
    if present.is_empty() {
        return ClassificationTag::Text;
    }

    if present.iter().all(|c| is_numeric_cell(c)) {
        return ClassificationTag::Numeric;
    }

    if present.iter().all(|c| is_datetime_cell(c)) {
        return ClassificationTag::Datetime;
    }

    let distinct: HashSet<_> = present.iter().filter_map(|c| c.render()).collect();
    let ratio = distinct.len() as f64 / present.len() as f64;
    if ratio < categorical_ratio_threshold {
        ClassificationTag::Categorical
    } else {
        ClassificationTag::Text
    }
}

pub(crate) fn is_numeric_cell(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(_) => true,
        CellValue::Text(s) => is_numeric_string(s),
        CellValue::Null | CellValue::Boolean(_) | CellValue::Temporal(_) => false,
    }
}

fn is_datetime_cell(cell: &CellValue) -> bool {
    match cell {
        CellValue::Temporal(_) => true,
        CellValue::Text(s) => parse_datetime_string(s).is_some(),
        CellValue::Null | CellValue::Number(_) | CellValue::Boolean(_) => false,
    }
}

/// Parse a date or timestamp written in one of the common layouts.
///
/// Bare numbers are never dates, even when they could be epoch timestamps.
pub fn parse_datetime_string(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if !DATE_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
