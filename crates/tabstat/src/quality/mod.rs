//! Data quality analysis module.
//!
//! Counts unique, repeated, missing and null entries per column, telling
//! blank strings apart from true nulls.

mod analyzer;

pub use analyzer::DataQualityAnalyzer;
