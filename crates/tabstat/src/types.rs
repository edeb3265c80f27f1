use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// Category assigned to a column at analysis time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationTag {
    Numeric,
    Datetime,
    Categorical,
    Text,
}

impl fmt::Display for ClassificationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationTag::Numeric => write!(f, "numeric"),
            ClassificationTag::Datetime => write!(f, "datetime"),
            ClassificationTag::Categorical => write!(f, "categorical"),
            ClassificationTag::Text => write!(f, "text"),
        }
    }
}

/// Cardinality and missingness counts that apply to every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    /// Number of rows, absent entries included.
    pub count: usize,
    /// Distinct non-absent values.
    pub unique_values: usize,
    /// Absent (null or NaN) entries.
    pub missing_values: usize,
    /// `missing_values / count * 100`, 0.0 for an empty column.
    pub missing_percentage: f64,
}

/// Summary statistics for a numeric column.
///
/// `None` marks a statistic that has too few values to be defined and
/// serializes as JSON `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub quartile_25: Option<f64>,
    pub quartile_50: Option<f64>,
    pub quartile_75: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

/// A value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// A value and its share of all rows, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueShare {
    pub value: String,
    pub percentage: f64,
}

/// Frequency breakdown for categorical and text columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoricalStatistics {
    /// Most frequent values, descending by count, ties in first-seen order.
    pub most_common: Vec<ValueCount>,
    /// Least frequent values, ascending by count, ties in first-seen order.
    pub least_common: Vec<ValueCount>,
    /// Row share of each `most_common` value.
    pub value_distribution: Vec<ValueShare>,
}

/// Statistics specific to the column's classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypedStatistics {
    Numeric(NumericStatistics),
    /// Datetime columns only carry basic statistics.
    Datetime,
    Categorical(CategoricalStatistics),
    Text(CategoricalStatistics),
}

impl TypedStatistics {
    pub fn classification(&self) -> ClassificationTag {
        match self {
            TypedStatistics::Numeric(_) => ClassificationTag::Numeric,
            TypedStatistics::Datetime => ClassificationTag::Datetime,
            TypedStatistics::Categorical(_) => ClassificationTag::Categorical,
            TypedStatistics::Text(_) => ClassificationTag::Text,
        }
    }

    pub fn numeric(&self) -> Option<&NumericStatistics> {
        match self {
            TypedStatistics::Numeric(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn categorical(&self) -> Option<&CategoricalStatistics> {
        match self {
            TypedStatistics::Categorical(stats) | TypedStatistics::Text(stats) => Some(stats),
            _ => None,
        }
    }
}

/// Statistics block for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub name: String,
    pub basic: BasicStatistics,
    pub stats: TypedStatistics,
}

impl ColumnStatistics {
    pub fn classification(&self) -> ClassificationTag {
        self.stats.classification()
    }
}

/// Data-quality counts for one column.
///
/// `missing_count` covers null, NaN and blank strings; `null_count` only
/// null and NaN, so `missing_count >= null_count` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub unique_count: usize,
    pub duplicate_count: usize,
    pub missing_count: usize,
    pub null_count: usize,
}

/// A column left out of a report, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFailure {
    pub column: String,
    pub code: String,
    pub reason: String,
}

impl ColumnFailure {
    pub fn new(column: impl Into<String>, error: &AnalysisError) -> Self {
        Self {
            column: column.into(),
            code: error.error_code().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Full analysis of one column inside a dataset report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub statistics: ColumnStatistics,
    pub quality: QualityMetrics,
}

impl ColumnReport {
    pub fn name(&self) -> &str {
        &self.statistics.name
    }
}

/// Aggregated analysis of a whole table.
///
/// `columns` keeps the table's column order. When some columns could not be
/// analyzed, `analyzed_columns < total_columns` and `failures` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub analyzed_columns: usize,
    /// Sum of `missing_count` over analyzed columns.
    pub total_missing_cells: usize,
    /// Rows identical to an earlier row across every column.
    pub duplicate_rows: usize,
    pub columns: Vec<ColumnReport>,
    pub failures: Vec<ColumnFailure>,
}

impl DatasetReport {
    /// Look up a column's report by name.
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// True when every column of the table made it into the report.
    pub fn is_complete(&self) -> bool {
        self.analyzed_columns == self.total_columns
    }
}

/// Quality metrics of one column, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub name: String,
    #[serde(flatten)]
    pub metrics: QualityMetrics,
}

/// Quality metrics for every analyzable column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub columns: Vec<ColumnQuality>,
    pub failures: Vec<ColumnFailure>,
}

impl QualityReport {
    pub fn column(&self, name: &str) -> Option<&QualityMetrics> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.metrics)
    }
}

// ============================================================================
// Dataset listing types
// ============================================================================

/// Stored dataset as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub size_bytes: u64,
    pub created: DateTime<Utc>,
    /// Upper-case extension, e.g. "CSV".
    pub format: String,
    pub columns: usize,
}

/// Column metadata for column listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Storage dtype as reported by polars, e.g. "i64" or "str".
    pub dtype: String,
    pub missing_count: usize,
    pub unique_count: usize,
}

/// First rows of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub total_rows: usize,
}

/// Result of storing a new upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub dataset_id: String,
    pub filename: String,
    pub rows: usize,
    pub columns: usize,
    pub report: DatasetReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification_tag_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ClassificationTag::Categorical).unwrap(),
            json!("categorical")
        );
        assert_eq!(ClassificationTag::Datetime.to_string(), "datetime");
    }

    #[test]
    fn test_insufficient_data_serializes_as_null() {
        let stats = NumericStatistics {
            mean: Some(4.0),
            ..Default::default()
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["mean"], json!(4.0));
        assert_eq!(value["std"], serde_json::Value::Null);
        assert_eq!(value["kurtosis"], serde_json::Value::Null);
    }

    #[test]
    fn test_typed_statistics_tagging() {
        let value = serde_json::to_value(TypedStatistics::Datetime).unwrap();
        assert_eq!(value, json!({ "type": "datetime" }));

        let text = TypedStatistics::Text(CategoricalStatistics::default());
        assert_eq!(text.classification(), ClassificationTag::Text);
        assert!(text.categorical().is_some());
        assert!(text.numeric().is_none());
    }

    #[test]
    fn test_column_failure_from_error() {
        let err = AnalysisError::MalformedColumnData {
            column: "tags".to_string(),
            reason: "unsupported dtype".to_string(),
        };
        let failure = ColumnFailure::new("tags", &err);
        assert_eq!(failure.code, "MALFORMED_COLUMN_DATA");
        assert!(failure.reason.contains("tags"));
    }

    #[test]
    fn test_column_quality_flattens_metrics() {
        let quality = ColumnQuality {
            name: "age".to_string(),
            metrics: QualityMetrics {
                unique_count: 3,
                duplicate_count: 1,
                missing_count: 1,
                null_count: 1,
            },
        };
        let value = serde_json::to_value(&quality).unwrap();
        assert_eq!(value["name"], json!("age"));
        assert_eq!(value["duplicate_count"], json!(1));
    }
}
