//! Column profiling: classification and per-column statistics.
//!
//! This module provides:
//! - Type classification of a column into numeric, datetime, categorical or text
//! - Basic statistics for every column
//! - Numeric or frequency statistics depending on the classification

mod statistics;
mod type_inference;

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::table::CellValue;
use crate::types::{ClassificationTag, ColumnStatistics, TypedStatistics};

pub use type_inference::{classify, parse_datetime_string};

pub(crate) use statistics::value_counts;

/// Computes the statistics block of a column for a given classification.
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Compute basic statistics plus the block that matches `tag`.
    ///
    /// Never fails: a fully absent column yields empty or `None` fields.
    pub fn compute(
        name: &str,
        cells: &[CellValue],
        tag: ClassificationTag,
        config: &AnalysisConfig,
    ) -> ColumnStatistics {
        let basic = statistics::basic_statistics(cells);

        let stats = match tag {
            ClassificationTag::Numeric => {
                let values = statistics::numeric_values(cells);
                TypedStatistics::Numeric(statistics::numeric_statistics(
                    &values,
                    config.min_values_for_dispersion,
                ))
            }
            ClassificationTag::Datetime => TypedStatistics::Datetime,
            ClassificationTag::Categorical => TypedStatistics::Categorical(
                statistics::categorical_statistics(cells, basic.count, config.top_n),
            ),
            ClassificationTag::Text => TypedStatistics::Text(statistics::categorical_statistics(
                cells,
                basic.count,
                config.top_n,
            )),
        };

        debug!(
            column = name,
            classification = %tag,
            count = basic.count,
            missing = basic.missing_values,
            "Computed column statistics"
        );

        ColumnStatistics {
            name: name.to_string(),
            basic,
            stats,
        }
    }

    /// Classify the column and compute its statistics in one step.
    pub fn profile(name: &str, cells: &[CellValue], config: &AnalysisConfig) -> ColumnStatistics {
        let tag = classify(cells, config.categorical_ratio_threshold);
        Self::compute(name, cells, tag, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[Option<f64>]) -> Vec<CellValue> {
        values
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Number))
            .collect()
    }

    #[test]
    fn test_compute_numeric_block() {
        let cells = numbers(&[Some(25.0), Some(30.0), None, Some(25.0), Some(40.0)]);
        let stats = StatisticsEngine::profile("age", &cells, &AnalysisConfig::default());

        assert_eq!(stats.name, "age");
        assert_eq!(stats.classification(), ClassificationTag::Numeric);
        assert_eq!(stats.basic.count, 5);
        assert_eq!(stats.basic.missing_values, 1);
        assert_eq!(stats.basic.missing_percentage, 20.0);

        let numeric = stats.stats.numeric().unwrap();
        assert_eq!(numeric.mean, Some(30.0));
        assert_eq!(numeric.median, Some(27.5));
    }

    #[test]
    fn test_compute_datetime_has_basic_only() {
        let cells = vec![
            CellValue::Text("2024-01-15".to_string()),
            CellValue::Text("2024-02-20".to_string()),
        ];
        let stats = StatisticsEngine::profile("joined", &cells, &AnalysisConfig::default());
        assert_eq!(stats.stats, TypedStatistics::Datetime);
        assert_eq!(stats.basic.unique_values, 2);
    }

    #[test]
    fn test_compute_all_absent_numeric_degrades() {
        let cells = numbers(&[None, None, None]);
        let stats = StatisticsEngine::compute(
            "empty",
            &cells,
            ClassificationTag::Numeric,
            &AnalysisConfig::default(),
        );
        let numeric = stats.stats.numeric().unwrap();
        assert_eq!(numeric.mean, None);
        assert_eq!(numeric.std, None);
        assert_eq!(stats.basic.missing_percentage, 100.0);
    }

    #[test]
    fn test_compute_text_uses_top_n() {
        let config = AnalysisConfig::builder().top_n(1).build().unwrap();
        let cells: Vec<CellValue> = ["x", "y", "z"]
            .iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect();
        let stats = StatisticsEngine::compute("word", &cells, ClassificationTag::Text, &config);
        let block = stats.stats.categorical().unwrap();
        assert_eq!(stats.classification(), ClassificationTag::Text);
        assert_eq!(block.most_common.len(), 1);
        assert_eq!(block.most_common[0].value, "x");
    }
}
