//! Configuration types for dataset analysis.
//!
//! This module provides the tunable heuristics and storage settings using the
//! builder pattern for flexible and ergonomic setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of uploaded dataset files.
pub const DEFAULT_UPLOAD_DIR: &str = "data/uploads";

/// Configuration for classification, statistics and dataset storage.
///
/// Use [`AnalysisConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tabstat::config::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .categorical_ratio_threshold(0.3)
///     .top_n(10)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// A column whose distinct/non-absent ratio is strictly below this value
    /// is categorical, otherwise text.
    /// Default: 0.5
    pub categorical_ratio_threshold: f64,

    /// Minimum number of values before std, skewness and kurtosis are reported.
    /// Default: 2
    pub min_values_for_dispersion: usize,

    /// Number of entries in most/least common value lists.
    /// Default: 5
    pub top_n: usize,

    /// Directory holding uploaded dataset files.
    /// Default: "data/uploads"
    pub upload_dir: PathBuf,

    /// Uploaded files older than this are removed by the cleanup sweep.
    /// Default: 30 minutes
    pub max_file_age: Duration,

    /// Time between two cleanup sweeps.
    /// Default: 5 minutes
    pub cleanup_interval: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            categorical_ratio_threshold: 0.5,
            min_values_for_dispersion: 2,
            top_n: 5,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_file_age: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.categorical_ratio_threshold > 0.0 && self.categorical_ratio_threshold <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "categorical_ratio_threshold".to_string(),
                value: self.categorical_ratio_threshold,
            });
        }

        if self.min_values_for_dispersion < 2 {
            return Err(ConfigValidationError::InvalidMinValues(
                self.min_values_for_dispersion,
            ));
        }

        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.top_n));
        }

        if self.max_file_age.is_zero() {
            return Err(ConfigValidationError::ZeroDuration(
                "max_file_age".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigValidationError::ZeroDuration(
                "cleanup_interval".to_string(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be in (0.0, 1.0])")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid minimum value count: {0} (must be at least 2)")]
    InvalidMinValues(usize),

    #[error("Invalid top-N size: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error("Duration '{0}' must be greater than zero")]
    ZeroDuration(String),
}

impl From<ConfigValidationError> for crate::error::AnalysisError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::AnalysisError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    categorical_ratio_threshold: Option<f64>,
    min_values_for_dispersion: Option<usize>,
    top_n: Option<usize>,
    upload_dir: Option<PathBuf>,
    max_file_age: Option<Duration>,
    cleanup_interval: Option<Duration>,
}

impl AnalysisConfigBuilder {
    /// Set the distinct ratio below which a column counts as categorical.
    ///
    /// # Arguments
    /// * `threshold` - Value in (0.0, 1.0] (e.g., 0.5 = fewer than half distinct)
    pub fn categorical_ratio_threshold(mut self, threshold: f64) -> Self {
        self.categorical_ratio_threshold = Some(threshold);
        self
    }

    /// Set the minimum value count for std, skewness and kurtosis.
    pub fn min_values_for_dispersion(mut self, count: usize) -> Self {
        self.min_values_for_dispersion = Some(count);
        self
    }

    /// Set the size of most/least common value lists.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Set the directory where uploaded files are stored.
    pub fn upload_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(path.into());
        self
    }

    /// Set the age after which uploaded files are swept.
    pub fn max_file_age(mut self, age: Duration) -> Self {
        self.max_file_age = Some(age);
        self
    }

    /// Set the time between cleanup sweeps.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let defaults = AnalysisConfig::default();
        let config = AnalysisConfig {
            categorical_ratio_threshold: self
                .categorical_ratio_threshold
                .unwrap_or(defaults.categorical_ratio_threshold),
            min_values_for_dispersion: self
                .min_values_for_dispersion
                .unwrap_or(defaults.min_values_for_dispersion),
            top_n: self.top_n.unwrap_or(defaults.top_n),
            upload_dir: self.upload_dir.unwrap_or(defaults.upload_dir),
            max_file_age: self.max_file_age.unwrap_or(defaults.max_file_age),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.categorical_ratio_threshold, 0.5);
        assert_eq!(config.min_values_for_dispersion, 2);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.upload_dir, PathBuf::from("data/uploads"));
        assert_eq!(config.max_file_age, Duration::from_secs(1800));
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_defaults() {
        let config = AnalysisConfig::builder().build().unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AnalysisConfig::builder()
            .categorical_ratio_threshold(0.3)
            .min_values_for_dispersion(4)
            .top_n(10)
            .upload_dir("/tmp/uploads")
            .max_file_age(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.categorical_ratio_threshold, 0.3);
        assert_eq!(config.min_values_for_dispersion, 4);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.max_file_age, Duration::from_secs(60));
    }

    #[test]
    fn test_validation_invalid_ratio() {
        let result = AnalysisConfig::builder()
            .categorical_ratio_threshold(1.5)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));

        let result = AnalysisConfig::builder()
            .categorical_ratio_threshold(0.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_min_values() {
        let result = AnalysisConfig::builder().min_values_for_dispersion(1).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMinValues(1)
        ));
    }

    #[test]
    fn test_validation_top_n_and_durations() {
        assert!(matches!(
            AnalysisConfig::builder().top_n(0).build().unwrap_err(),
            ConfigValidationError::InvalidTopN(0)
        ));
        assert!(matches!(
            AnalysisConfig::builder()
                .cleanup_interval(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigValidationError::ZeroDuration(_)
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
