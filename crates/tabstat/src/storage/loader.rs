//! Reading CSV and Excel files into data frames.

use calamine::{Data, Reader, open_workbook_auto};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::{AnalysisError, Result, ResultExt};
use crate::table::ensure_unique_names;
use crate::utils::NA_MARKERS;

/// Extensions accepted for upload, lower-case with the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".csv", ".xlsx", ".xls"];

/// Rows used for CSV schema inference.
const INFER_SCHEMA_ROWS: usize = 1000;

static EMPTY_CELL: Data = Data::Empty;

const DUPLICATE_SUFFIX: &str = "_duplicated_";

/// Largest float that still converts to `i64` without losing precision.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Tabular file format, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Detect the format from a file name or path (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        match extension.as_str() {
            ".csv" => Ok(FileFormat::Csv),
            ".xlsx" => Ok(FileFormat::Xlsx),
            ".xls" => Ok(FileFormat::Xls),
            _ => Err(AnalysisError::UnsupportedFileFormat {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    extension
                },
                allowed: ALLOWED_EXTENSIONS.join(", "),
            }),
        }
    }

    /// Lower-case extension with the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Xlsx => ".xlsx",
            FileFormat::Xls => ".xls",
        }
    }

    /// Upper-case label for listings, e.g. "CSV".
    pub fn label(&self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Xlsx => "XLSX",
            FileFormat::Xls => "XLS",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read a CSV or Excel file into a data frame.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let format = FileFormat::from_path(path)?;
    debug!(path = %path.display(), %format, "Reading table");

    match format {
        FileFormat::Csv => read_csv(path),
        FileFormat::Xlsx | FileFormat::Xls => read_excel(path),
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NA_MARKERS.iter().map(|m| (*m).into()).collect());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open CSV file {}", path.display()))?
        .finish()
        .context(format!("Failed to parse CSV file {}", path.display()))?;

    reject_renamed_duplicates(&df)?;
    Ok(df)
}

/// Polars reads a repeated header `a` as `a`, `a_duplicated_0`, ...
fn reject_renamed_duplicates(df: &DataFrame) -> Result<()> {
    let names: HashSet<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();

    for name in df.get_column_names() {
        if let Some((original, n)) = name.as_str().rsplit_once(DUPLICATE_SUFFIX)
            && !n.is_empty()
            && n.bytes().all(|b| b.is_ascii_digit())
            && names.contains(original)
        {
            return Err(AnalysisError::DuplicateColumn(original.to_string()));
        }
    }
    Ok(())
}

fn read_excel(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnalysisError::MalformedColumnData {
            column: String::new(),
            reason: format!("workbook {} has no worksheets", path.display()),
        })?;

    let range = workbook.worksheet_range(&sheet)?;
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    debug!(sheet = %sheet, rows = rows.len(), "Read worksheet");

    frame_from_rows(&rows)
}

/// Build a frame from worksheet rows; the first row is the header.
///
/// A column becomes Int64, Float64 or Boolean when every non-empty cell
/// agrees, and String otherwise. Empty and error cells are null.
pub(crate) fn frame_from_rows(rows: &[Vec<Data>]) -> Result<DataFrame> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let names: Vec<String> = (0..width)
        .map(|j| match header.get(j) {
            Some(Data::Empty) | None => format!("column_{}", j + 1),
            Some(Data::String(s)) if s.trim().is_empty() => format!("column_{}", j + 1),
            Some(cell) => cell.to_string(),
        })
        .collect();
    ensure_unique_names(names.iter().map(String::as_str))?;

    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(j).unwrap_or(&EMPTY_CELL))
                .collect();
            excel_column(name, &cells).into()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

fn is_empty_cell(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

fn excel_column(name: &str, cells: &[&Data]) -> Series {
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !is_empty_cell(c)).collect();

    let all_numeric = present
        .iter()
        .all(|c| matches!(c, Data::Int(_) | Data::Float(_)));
    let all_bool = present.iter().all(|c| matches!(c, Data::Bool(_)));

    if !present.is_empty() && all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();

        let integral = values
            .iter()
            .flatten()
            .all(|v| v.fract() == 0.0 && v.abs() < MAX_EXACT_INT);
        if integral {
            let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
            return Series::new(name.into(), ints);
        }
        return Series::new(name.into(), values);
    }

    if !present.is_empty() && all_bool {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells.iter().map(|c| cell_text(c)).collect();
    Series::new(name.into(), values)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.to_string())
            .or_else(|| Some(dt.as_f64().to_string())),
        other => Some(other.to_string()),
    }
}
