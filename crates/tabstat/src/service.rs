//! Request-level operations over stored datasets.

use polars::prelude::*;
use static_assertions::assert_impl_all;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::profiler::value_counts;
use crate::reporting::DatasetAggregator;
use crate::storage::{DatasetStore, IngestedDataset};
use crate::table::series_cells;
use crate::types::{
    ColumnInfo, ColumnStatistics, DatasetInfo, DatasetPreview, DatasetReport, QualityReport,
    UploadSummary,
};

/// Bounds of the `n` argument of [`AnalysisService::head`].
pub const HEAD_ROWS_MIN: usize = 1;
pub const HEAD_ROWS_MAX: usize = 100;
pub const HEAD_ROWS_DEFAULT: usize = 10;

/// Entry point for callers such as a CLI or an HTTP layer.
///
/// Every analysis runs against an immutable snapshot returned by the store,
/// so concurrent requests need no further locking.
#[derive(Debug, Clone)]
pub struct AnalysisService {
    store: Arc<DatasetStore>,
    aggregator: DatasetAggregator,
}

assert_impl_all!(AnalysisService: Send, Sync);
assert_impl_all!(DatasetStore: Send, Sync);

impl AnalysisService {
    pub fn new(store: Arc<DatasetStore>, config: AnalysisConfig) -> Self {
        Self {
            store,
            aggregator: DatasetAggregator::new(config),
        }
    }

    /// Validate `config` and open the store at its upload directory.
    pub fn from_config(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let store = DatasetStore::open(&config.upload_dir)?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.aggregator.config()
    }

    /// Store a file and analyze it.
    pub fn upload(&self, path: &Path) -> Result<UploadSummary> {
        let stored = self.store.ingest(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.summarize(stored, filename)
    }

    /// Store uploaded bytes and analyze them.
    pub fn upload_bytes(&self, filename: &str, bytes: &[u8]) -> Result<UploadSummary> {
        let stored = self.store.ingest_bytes(filename, bytes)?;
        self.summarize(stored, filename.to_string())
    }

    fn summarize(&self, stored: IngestedDataset, filename: String) -> Result<UploadSummary> {
        let report = self.aggregator.aggregate(&stored.table)?;
        info!(id = %stored.id, file = %filename, "Upload analyzed");
        Ok(UploadSummary {
            dataset_id: stored.id,
            filename,
            rows: stored.table.height(),
            columns: stored.table.width(),
            report,
        })
    }

    pub fn get_column_report(&self, dataset_id: &str, column: &str) -> Result<ColumnStatistics> {
        let table = self.store.load_table(dataset_id)?;
        self.aggregator.column_statistics(&table, column)
    }

    pub fn get_dataset_report(&self, dataset_id: &str) -> Result<DatasetReport> {
        let table = self.store.load_table(dataset_id)?;
        self.aggregator.aggregate(&table)
    }

    pub fn get_quality_report(&self, dataset_id: &str) -> Result<QualityReport> {
        let table = self.store.load_table(dataset_id)?;
        self.aggregator.quality_report(&table)
    }

    /// Storage dtype, null count and distinct count of each column.
    pub fn list_columns(&self, dataset_id: &str) -> Result<Vec<ColumnInfo>> {
        let table = self.store.load_table(dataset_id)?;

        table
            .get_columns()
            .iter()
            .map(|column| -> Result<ColumnInfo> {
                let series = column.as_materialized_series();
                let unique_count = match series_cells(series) {
                    Ok(cells) => value_counts(cells.iter().filter(|c| !c.is_null())).len(),
                    Err(_) => series.drop_nulls().n_unique()?,
                };
                Ok(ColumnInfo {
                    name: column.name().to_string(),
                    dtype: series.dtype().to_string(),
                    missing_count: series.null_count(),
                    unique_count,
                })
            })
            .collect()
    }

    /// First `n` rows, with `HEAD_ROWS_MIN <= n <= HEAD_ROWS_MAX`.
    pub fn head(&self, dataset_id: &str, n: usize) -> Result<DatasetPreview> {
        if !(HEAD_ROWS_MIN..=HEAD_ROWS_MAX).contains(&n) {
            return Err(AnalysisError::InvalidArgument(format!(
                "n must be between {HEAD_ROWS_MIN} and {HEAD_ROWS_MAX}, got {n}"
            )));
        }

        let table = self.store.load_table(dataset_id)?;
        let head = table.head(Some(n));

        let mut columns = Vec::with_capacity(head.width());
        let mut cells_by_column = Vec::with_capacity(head.width());
        for column in head.get_columns() {
            columns.push(column.name().to_string());
            cells_by_column.push(series_cells(column.as_materialized_series())?);
        }

        let rows = (0..head.height())
            .map(|i| cells_by_column.iter().map(|cells| cells[i].to_json()).collect())
            .collect();

        Ok(DatasetPreview {
            columns,
            rows,
            total_rows: table.height(),
        })
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetInfo>> {
        self.store.list_datasets()
    }

    pub fn delete_dataset(&self, dataset_id: &str) -> Result<()> {
        self.store.delete(dataset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassificationTag;
    use serde_json::json;
    use tempfile::TempDir;

    const CSV: &str = "name,age,city\nAlice,25,NYC\nBob,,LA\nCarol,40,NYC\n";

    fn service() -> (TempDir, AnalysisService) {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .upload_dir(dir.path().join("uploads"))
            .build()
            .unwrap();
        (dir, AnalysisService::from_config(config).unwrap())
    }

    #[test]
    fn test_upload_bytes_summary() {
        let (_dir, service) = service();
        let summary = service.upload_bytes("people.csv", CSV.as_bytes()).unwrap();
        assert_eq!(summary.filename, "people.csv");
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.columns, 3);
        assert_eq!(summary.report.total_missing_cells, 1);
        assert!(summary.dataset_id.ends_with(".csv"));
    }

    #[test]
    fn test_reports_for_unknown_dataset() {
        let (_dir, service) = service();
        assert!(service.get_dataset_report("missing.csv").unwrap_err().is_not_found());
        assert!(service.get_quality_report("missing.csv").unwrap_err().is_not_found());
        let err = service.get_column_report("missing.csv", "age").unwrap_err();
        assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
    }

    #[test]
    fn test_column_report() {
        let (_dir, service) = service();
        let id = service.upload_bytes("people.csv", CSV.as_bytes()).unwrap().dataset_id;

        let age = service.get_column_report(&id, "age").unwrap();
        assert_eq!(age.classification(), ClassificationTag::Numeric);
        assert_eq!(age.stats.numeric().unwrap().mean, Some(32.5));

        let err = service.get_column_report(&id, "salary").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_list_columns() {
        let (_dir, service) = service();
        let id = service.upload_bytes("people.csv", CSV.as_bytes()).unwrap().dataset_id;

        let columns = service.list_columns(&id).unwrap();
        let age = columns.iter().find(|c| c.name == "age").unwrap();
        assert_eq!(age.dtype, "i64");
        assert_eq!(age.missing_count, 1);
        assert_eq!(age.unique_count, 2);

        let city = columns.iter().find(|c| c.name == "city").unwrap();
        assert_eq!(city.dtype, "str");
        assert_eq!(city.unique_count, 2);
    }

    #[test]
    fn test_head_bounds_and_rows() {
        let (_dir, service) = service();
        let id = service.upload_bytes("people.csv", CSV.as_bytes()).unwrap().dataset_id;

        for n in [0, 101] {
            let err = service.head(&id, n).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        }

        let preview = service.head(&id, 2).unwrap();
        assert_eq!(preview.columns, vec!["name", "age", "city"]);
        assert_eq!(preview.total_rows, 3);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0], vec![json!("Alice"), json!(25), json!("NYC")]);
        assert_eq!(preview.rows[1][1], serde_json::Value::Null);

        let all = service.head(&id, HEAD_ROWS_MAX).unwrap();
        assert_eq!(all.rows.len(), 3);
    }

    #[test]
    fn test_delete_dataset() {
        let (_dir, service) = service();
        let id = service.upload_bytes("people.csv", CSV.as_bytes()).unwrap().dataset_id;
        assert_eq!(service.list_datasets().unwrap().len(), 1);

        service.delete_dataset(&id).unwrap();
        assert!(service.list_datasets().unwrap().is_empty());
        assert!(service.get_dataset_report(&id).unwrap_err().is_not_found());
    }
}
