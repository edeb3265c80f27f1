//! Statistical functions for column analysis.

use std::collections::HashMap;

use crate::table::CellValue;
use crate::types::{
    BasicStatistics, CategoricalStatistics, NumericStatistics, ValueCount, ValueShare,
};
use crate::utils::parse_numeric_string;

/// Count, distinct and missing figures shared by every classification.
pub(crate) fn basic_statistics(cells: &[CellValue]) -> BasicStatistics {
    let count = cells.len();
    let missing_values = cells.iter().filter(|c| c.is_null()).count();
    let unique_values = value_counts(cells.iter().filter(|c| !c.is_null())).len();

    let missing_percentage = if count > 0 {
        (missing_values as f64 / count as f64) * 100.0
    } else {
        0.0
    };

    BasicStatistics {
        count,
        unique_values,
        missing_values,
        missing_percentage,
    }
}

/// Numbers of every cell that has one. Absent and unparseable cells are skipped.
pub(crate) fn numeric_values(cells: &[CellValue]) -> Vec<f64> {
    cells
        .iter()
        .filter_map(|cell| match cell {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => parse_numeric_string(s),
            _ => None,
        })
        .collect()
}

/// Compute numeric statistics over `values`.
///
/// Location statistics need one value; std, skewness and kurtosis need
/// `min_values_for_dispersion`. Anything below that is `None`.
pub(crate) fn numeric_statistics(values: &[f64], min_values_for_dispersion: usize) -> NumericStatistics {
    if values.is_empty() {
        return NumericStatistics::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let median = quantile(&sorted, 0.5);
    let dispersion = values.len() >= min_values_for_dispersion.max(2);

    NumericStatistics {
        mean: Some(mean(values)),
        median,
        std: dispersion.then(|| sample_std(values)).filter(|v| v.is_finite()),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        quartile_25: quantile(&sorted, 0.25),
        quartile_50: median,
        quartile_75: quantile(&sorted, 0.75),
        skewness: dispersion.then(|| skewness(values)).filter(|v| v.is_finite()),
        kurtosis: dispersion.then(|| kurtosis(values)).filter(|v| v.is_finite()),
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with one delta degree of freedom.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n <= 1.0 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Linear interpolation between order statistics at index `q * (n - 1)`.
///
/// `sorted` must be ascending.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Second, third and fourth central moments (population form).
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Adjusted Fisher-Pearson skewness (G1), falling back to g1 below 3 values.
pub(crate) fn skewness(values: &[f64]) -> f64 {
    if values.len() < 2 || is_constant(values) {
        return 0.0;
    }
    let n = values.len() as f64;
    let (m2, m3, _) = central_moments(values);
    let g1 = m3 / m2.powf(1.5);
    if n >= 3.0 {
        g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
    } else {
        g1
    }
}

/// Bias-corrected excess kurtosis (G2), falling back to g2 below 4 values.
pub(crate) fn kurtosis(values: &[f64]) -> f64 {
    if values.len() < 2 || is_constant(values) {
        return 0.0;
    }
    let n = values.len() as f64;
    let (m2, _, m4) = central_moments(values);
    let g2 = m4 / (m2 * m2) - 3.0;
    if n >= 4.0 {
        ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
    } else {
        g2
    }
}

/// Frequencies of rendered values, in first-seen order.
pub(crate) fn value_counts<'a>(cells: impl Iterator<Item = &'a CellValue>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for cell in cells {
        let Some(key) = cell.render() else {
            continue;
        };
        match index.get(key.as_ref()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.to_string(), counts.len());
                counts.push((key.into_owned(), 1));
            }
        }
    }

    counts
}

/// Most/least common values and the row share of the most common ones.
///
/// Percentages divide by `row_count`, absent rows included.
pub(crate) fn categorical_statistics(
    cells: &[CellValue],
    row_count: usize,
    top_n: usize,
) -> CategoricalStatistics {
    let counts = value_counts(cells.iter().filter(|c| !c.is_null()));

    // Stable sorts keep first-seen order among ties.
    let mut descending = counts.clone();
    descending.sort_by(|a, b| b.1.cmp(&a.1));
    let mut ascending = counts;
    ascending.sort_by(|a, b| a.1.cmp(&b.1));

    let most_common: Vec<ValueCount> = descending
        .into_iter()
        .take(top_n)
        .map(|(value, count)| ValueCount { value, count })
        .collect();

    let least_common = ascending
        .into_iter()
        .take(top_n)
        .map(|(value, count)| ValueCount { value, count })
        .collect();

    let value_distribution = most_common
        .iter()
        .map(|vc| ValueShare {
            value: vc.value.clone(),
            percentage: if row_count > 0 {
                vc.count as f64 / row_count as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    CategoricalStatistics {
        most_common,
        least_common,
        value_distribution,
    }
}
