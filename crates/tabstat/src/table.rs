//! Lowering of polars columns into scalar cells.
//!
//! Every analysis step works on `&[CellValue]` so that null, NaN and blank
//! strings are told apart the same way regardless of the storage dtype.

use polars::prelude::*;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::error::{AnalysisError, Result};
use crate::utils::{format_number, is_blank, is_numeric_dtype, is_temporal_dtype};

/// One scalar entry of a table column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Null or NaN.
    Null,
    Number(f64),
    Boolean(bool),
    Text(String),
    /// Native date/time value, kept as its text rendering.
    Temporal(String),
}

impl CellValue {
    /// Strictly absent: null or NaN.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Absent, or text that trims to nothing.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) | CellValue::Temporal(s) => is_blank(s),
            CellValue::Number(_) | CellValue::Boolean(_) => false,
        }
    }

    /// Text form used for distinct counting and frequency keys.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Null => None,
            CellValue::Number(v) => Some(Cow::Owned(format_number(*v))),
            CellValue::Boolean(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            CellValue::Text(s) | CellValue::Temporal(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    /// JSON form used by previews.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Number(v) => crate::utils::number_to_json(*v),
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
            CellValue::Text(s) | CellValue::Temporal(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Lower a series into cells.
///
/// Fails with [`AnalysisError::MalformedColumnData`] for dtypes that have no
/// scalar reading (lists, structs, binary, objects).
pub fn series_cells(series: &Series) -> Result<Vec<CellValue>> {
    let dtype = series.dtype();

    if is_numeric_dtype(dtype) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(x) if !x.is_nan() => CellValue::Number(x),
                _ => CellValue::Null,
            })
            .collect());
    }

    match dtype {
        DataType::Boolean => Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Boolean))
            .collect()),
        DataType::String => Ok(string_cells(series, CellValue::Text)?),
        DataType::Null => Ok(vec![CellValue::Null; series.len()]),
        dt if dt.is_categorical() || dt.is_enum() => {
            let strings = series.cast(&DataType::String)?;
            string_cells(&strings, CellValue::Text)
        }
        dt if is_temporal_dtype(dt) => {
            let strings = series.cast(&DataType::String)?;
            string_cells(&strings, CellValue::Temporal)
        }
        other => Err(AnalysisError::MalformedColumnData {
            column: series.name().to_string(),
            reason: format!("dtype {other} has no scalar representation"),
        }),
    }
}

fn string_cells(series: &Series, wrap: fn(String) -> CellValue) -> Result<Vec<CellValue>> {
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map_or(CellValue::Null, |s| wrap(s.to_string())))
        .collect())
}

/// Fail with [`AnalysisError::DuplicateColumn`] if a name repeats.
pub fn ensure_unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(AnalysisError::DuplicateColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Count rows that repeat an earlier row across every column.
pub fn count_duplicate_rows(df: &DataFrame) -> Result<usize> {
    if df.height() == 0 || df.width() == 0 {
        return Ok(0);
    }
    let unique_rows = df
        .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?
        .height();
    Ok(df.height() - unique_rows)
}
