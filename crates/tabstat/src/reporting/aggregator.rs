use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::profiler::StatisticsEngine;
use crate::quality::DataQualityAnalyzer;
use crate::table::{count_duplicate_rows, ensure_unique_names, series_cells};
use crate::types::{
    ColumnFailure, ColumnQuality, ColumnReport, ColumnStatistics, DatasetReport, QualityReport,
};

/// Builds dataset-wide reports from per-column analysis.
///
/// A column that cannot be analyzed is logged and listed in the report's
/// `failures` instead of aborting the whole table.
#[derive(Debug, Clone, Default)]
pub struct DatasetAggregator {
    config: AnalysisConfig,
}

impl DatasetAggregator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Classify, describe and quality-check every column of `df`.
    pub fn aggregate(&self, df: &DataFrame) -> Result<DatasetReport> {
        check_column_names(df)?;

        let mut columns = Vec::with_capacity(df.width());
        let mut failures = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            match series_cells(column.as_materialized_series()) {
                Ok(cells) => {
                    let statistics = StatisticsEngine::profile(name, &cells, &self.config);
                    let quality = DataQualityAnalyzer::analyze(&cells);
                    columns.push(ColumnReport {
                        statistics,
                        quality,
                    });
                }
                Err(e) => {
                    warn!(column = name, error = %e, "Skipping column that cannot be analyzed");
                    failures.push(ColumnFailure::new(name, &e));
                }
            }
        }

        let total_missing_cells = columns.iter().map(|c| c.quality.missing_count).sum();
        let duplicate_rows = count_duplicate_rows(df)?;

        let report = DatasetReport {
            total_rows: df.height(),
            total_columns: df.width(),
            analyzed_columns: columns.len(),
            total_missing_cells,
            duplicate_rows,
            columns,
            failures,
        };

        info!(
            rows = report.total_rows,
            columns = report.total_columns,
            analyzed = report.analyzed_columns,
            "Dataset analysis complete"
        );

        Ok(report)
    }

    /// Quality metrics for every column that can be lowered.
    pub fn quality_report(&self, df: &DataFrame) -> Result<QualityReport> {
        check_column_names(df)?;

        let mut columns = Vec::with_capacity(df.width());
        let mut failures = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            match series_cells(column.as_materialized_series()) {
                Ok(cells) => columns.push(ColumnQuality {
                    name: name.to_string(),
                    metrics: DataQualityAnalyzer::analyze(&cells),
                }),
                Err(e) => {
                    warn!(column = name, error = %e, "Skipping column in quality report");
                    failures.push(ColumnFailure::new(name, &e));
                }
            }
        }

        debug!(columns = columns.len(), "Quality report built");

        Ok(QualityReport {
            total_rows: df.height(),
            columns,
            failures,
        })
    }

    /// Statistics block of a single column.
    ///
    /// Unlike [`aggregate`](Self::aggregate), a column that cannot be lowered
    /// is an error here since there is nothing partial to return.
    pub fn column_statistics(&self, df: &DataFrame, name: &str) -> Result<ColumnStatistics> {
        let column = df
            .column(name)
            .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))?;
        let cells = series_cells(column.as_materialized_series())?;
        Ok(StatisticsEngine::profile(name, &cells, &self.config))
    }
}

fn check_column_names(df: &DataFrame) -> Result<()> {
    ensure_unique_names(df.get_column_names().into_iter().map(|n| n.as_str()))
}
