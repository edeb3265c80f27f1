//! Counting unique, repeated, blank and null entries in a single column.

use crate::profiler::value_counts;
use crate::table::CellValue;
use crate::types::QualityMetrics;

/// Per-column data-quality counts.
///
/// Blank text counts as missing but not as null; unique and duplicate counts
/// only look at non-blank values.
pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    pub fn analyze(cells: &[CellValue]) -> QualityMetrics {
        let null_count = cells.iter().filter(|c| c.is_null()).count();
        let missing_count = cells.iter().filter(|c| c.is_blank()).count();

        let counts = value_counts(cells.iter().filter(|c| !c.is_blank()));
        let duplicate_count = counts
            .iter()
            .filter(|(_, k)| *k > 1)
            .map(|(_, k)| k - 1)
            .sum();

        QualityMetrics {
            unique_count: counts.len(),
            duplicate_count,
            missing_count,
            null_count,
        }
    }
}
