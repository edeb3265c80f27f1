//! Tabular Dataset Statistics Library
//!
//! Descriptive statistics and data-quality profiling for tabular datasets,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! - **Type Classification**: each column is tagged numeric, datetime,
//!   categorical or text from its values
//! - **Column Statistics**: count/unique/missing figures for every column,
//!   plus moments and quartiles for numeric columns and frequency tables for
//!   categorical and text columns
//! - **Data Quality**: unique, duplicate, missing and null counts that tell
//!   blank strings apart from true nulls
//! - **Dataset Reports**: per-column blocks and dataset totals, with columns
//!   that cannot be analyzed reported instead of aborting the table
//! - **Dataset Store**: CSV/Excel uploads on disk with an in-memory frame
//!   cache and periodic removal of stale files
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabstat::{AnalysisConfig, AnalysisService};
//!
//! let config = AnalysisConfig::builder()
//!     .upload_dir("data/uploads")
//!     .build()?;
//! let service = AnalysisService::from_config(config)?;
//!
//! let summary = service.upload("people.csv".as_ref())?;
//! println!("Stored as {}", summary.dataset_id);
//!
//! let age = service.get_column_report(&summary.dataset_id, "age")?;
//! if let Some(numeric) = age.stats.numeric() {
//!     println!("mean age: {:?}", numeric.mean);
//! }
//! ```
//!
//! # Analyzing a frame directly
//!
//! ```rust,ignore
//! use tabstat::{AnalysisConfig, DatasetAggregator};
//! use polars::prelude::*;
//!
//! let df = df!["city" => ["NYC", "LA", "NYC"]]?;
//! let report = DatasetAggregator::new(AnalysisConfig::default()).aggregate(&df)?;
//! assert_eq!(report.total_rows, 3);
//! ```

pub mod config;
pub mod error;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod service;
pub mod storage;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use profiler::{StatisticsEngine, classify};
pub use quality::DataQualityAnalyzer;
pub use reporting::DatasetAggregator;
pub use service::AnalysisService;
pub use storage::{DatasetStore, FileFormat};
pub use table::{CellValue, series_cells};
pub use types::{
    BasicStatistics, CategoricalStatistics, ClassificationTag, ColumnFailure, ColumnInfo,
    ColumnQuality, ColumnReport, ColumnStatistics, DatasetInfo, DatasetPreview, DatasetReport,
    NumericStatistics, QualityMetrics, QualityReport, TypedStatistics, UploadSummary,
    ValueCount, ValueShare,
};
pub use utils::{clean_numeric_string, is_numeric_dtype, parse_numeric_string};
