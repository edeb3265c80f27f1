//! Dataset-level report aggregation.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabstat::reporting::DatasetAggregator;
//!
//! let aggregator = DatasetAggregator::new(config);
//! let report = aggregator.aggregate(&df)?;
//! if !report.is_complete() {
//!     for failure in &report.failures {
//!         eprintln!("{}: {}", failure.column, failure.reason);
//!     }
//! }
//! ```

mod aggregator;

pub use aggregator::DatasetAggregator;
