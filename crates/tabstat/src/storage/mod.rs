//! File-backed dataset storage.
//!
//! This module provides:
//! - Format detection and CSV/Excel loading
//! - A dataset store with an in-memory table cache
//! - Sweeping of stale uploads, once or from a background worker

mod cleanup;
mod loader;
mod store;

pub use cleanup::{CleanupStats, CleanupWorker, SweepOutcome, sweep_stale_files};
pub use loader::{ALLOWED_EXTENSIONS, FileFormat, read_table};
pub use store::{DatasetStore, IngestedDataset};
