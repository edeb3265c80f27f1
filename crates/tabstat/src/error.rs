//! Custom error types for dataset analysis.
//!
//! This module provides the error hierarchy using `thiserror` for lookups,
//! loading and per-column analysis failures.
//!
//! Errors are serializable so a transport layer can hand them to clients as
//! `{ "code": ..., "message": ... }` without knowing every variant.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for dataset analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No dataset is stored under the given identifier.
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// File extension is not one of the accepted tabular formats.
    #[error("Unsupported file format '{extension}'. Allowed formats: {allowed}")]
    UnsupportedFileFormat { extension: String, allowed: String },

    /// A column's contents cannot be lowered into scalar cells.
    #[error("Malformed data in column '{column}': {reason}")]
    MalformedColumnData { column: String, reason: String },

    /// Two columns of one table share a name.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A caller-supplied argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Spreadsheet reader error.
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnsupportedFileFormat { .. } => "UNSUPPORTED_FILE_FORMAT",
            Self::MalformedColumnData { .. } => "MALFORMED_COLUMN_DATA",
            Self::DuplicateColumn(_) => "DUPLICATE_COLUMN",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Excel(_) => "EXCEL_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the requested dataset or column does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DatasetNotFound(_) | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::UnsupportedFileFormat { .. }
            | Self::InvalidArgument(_)
            | Self::DuplicateColumn(_) => true,
            Self::WithContext { source, .. } => source.is_client_error(),
            _ => self.is_not_found(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}
