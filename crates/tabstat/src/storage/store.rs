use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::DatasetInfo;

use super::loader::{FileFormat, read_table};

/// Stem of a generated id: `{YYYYmmdd_HHMMSS}_{8 hex}`.
static DATASET_ID_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}_\d{6}_[0-9a-f]{8}$").expect("Invalid regex: dataset id"));

/// Modification time and length a cached frame was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(metadata: &fs::Metadata) -> Result<Self> {
        Ok(Self {
            modified: metadata.modified()?,
            len: metadata.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct CachedTable {
    stamp: FileStamp,
    table: Arc<DataFrame>,
}

/// A freshly stored upload.
#[derive(Debug, Clone)]
pub struct IngestedDataset {
    pub id: String,
    pub table: Arc<DataFrame>,
}

/// File-backed dataset store with an in-memory table cache.
///
/// Cached frames are never mutated. A reload after the file changed on disk
/// replaces the entry, so readers holding the old `Arc` keep a consistent
/// snapshot.
#[derive(Debug)]
pub struct DatasetStore {
    upload_dir: PathBuf,
    cache: RwLock<HashMap<String, CachedTable>>,
}

impl DatasetStore {
    /// Open a store rooted at `upload_dir`, creating the directory if needed.
    pub fn open(upload_dir: impl Into<PathBuf>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir).context(format!(
            "Failed to create upload directory {}",
            upload_dir.display()
        ))?;
        debug!(dir = %upload_dir.display(), "Opened dataset store");

        Ok(Self {
            upload_dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Copy the file at `source` into the store.
    ///
    /// The copy is removed again if it cannot be read as a table.
    pub fn ingest(&self, source: &Path) -> Result<IngestedDataset> {
        let format = FileFormat::from_path(source)?;
        self.store_new(format, |target| fs::copy(source, target).map(|_| ()))
    }

    /// Store uploaded bytes; `filename` only decides the format.
    pub fn ingest_bytes(&self, filename: &str, bytes: &[u8]) -> Result<IngestedDataset> {
        let format = FileFormat::from_path(filename)?;
        self.store_new(format, |target| fs::write(target, bytes))
    }

    fn store_new(
        &self,
        format: FileFormat,
        write: impl FnOnce(&Path) -> std::io::Result<()>,
    ) -> Result<IngestedDataset> {
        let id = new_dataset_id(format);
        let path = self.upload_dir.join(&id);

        write(&path).context(format!("Failed to store upload {id}"))?;

        let table = match read_table(&path) {
            Ok(df) => Arc::new(df),
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&path) {
                    warn!(id = %id, error = %remove_err, "Failed to remove unreadable upload");
                }
                return Err(e);
            }
        };

        let stamp = FileStamp::of(&fs::metadata(&path)?)?;
        self.cache.write().insert(
            id.clone(),
            CachedTable {
                stamp,
                table: Arc::clone(&table),
            },
        );

        info!(
            id = %id,
            rows = table.height(),
            columns = table.width(),
            "Stored dataset"
        );

        Ok(IngestedDataset { id, table })
    }

    /// Resolve a dataset id to its file, or `DatasetNotFound`.
    fn dataset_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(AnalysisError::DatasetNotFound(id.to_string()));
        }
        let path = self.upload_dir.join(id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(AnalysisError::DatasetNotFound(id.to_string()))
        }
    }

    /// Load a dataset, serving the cached frame while its file is unchanged.
    pub fn load_table(&self, id: &str) -> Result<Arc<DataFrame>> {
        let path = match self.dataset_path(id) {
            Ok(path) => path,
            Err(e) => {
                self.invalidate(id);
                return Err(e);
            }
        };
        let stamp = FileStamp::of(&fs::metadata(&path)?)?;

        if let Some(entry) = self.cache.read().get(id)
            && entry.stamp == stamp
        {
            debug!(id, "Dataset served from cache");
            return Ok(Arc::clone(&entry.table));
        }

        let table = Arc::new(read_table(&path).context(format!("Failed to load dataset {id}"))?);
        self.cache.write().insert(
            id.to_string(),
            CachedTable {
                stamp,
                table: Arc::clone(&table),
            },
        );
        info!(id, rows = table.height(), columns = table.width(), "Loaded dataset");

        Ok(table)
    }

    /// Ids of every stored dataset file, sorted by name.
    ///
    /// Only files named like a generated id count; anything else sharing the
    /// directory is left alone.
    pub fn list_known_dataset_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.upload_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_dataset_id(&name) {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Describe every readable dataset, newest first.
    pub fn list_datasets(&self) -> Result<Vec<DatasetInfo>> {
        let mut datasets = Vec::new();

        for id in self.list_known_dataset_ids()? {
            match self.describe(&id) {
                Ok(info) => datasets.push(info),
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable dataset"),
            }
        }

        datasets.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));
        Ok(datasets)
    }

    fn describe(&self, id: &str) -> Result<DatasetInfo> {
        let path = self.dataset_path(id)?;
        let metadata = fs::metadata(&path)?;
        let created = metadata.created().or_else(|_| metadata.modified())?;
        let format = FileFormat::from_path(&path)?;
        let table = self.load_table(id)?;

        Ok(DatasetInfo {
            id: id.to_string(),
            size_bytes: metadata.len(),
            created: DateTime::<Utc>::from(created),
            format: format.label().to_string(),
            columns: table.width(),
        })
    }

    /// Remove a dataset's file and cache entry.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.dataset_path(id)?;
        fs::remove_file(&path).context(format!("Failed to delete {id}"))?;
        self.invalidate(id);
        info!(id, "Deleted dataset");
        Ok(())
    }

    /// Drop a cache entry; returns whether one existed.
    pub fn invalidate(&self, id: &str) -> bool {
        self.cache.write().remove(id).is_some()
    }

    /// Number of frames currently held in memory.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

/// `{YYYYmmdd_HHMMSS}_{8 hex}{ext}`
fn new_dataset_id(format: FileFormat) -> String {
    format!(
        "{}_{:08x}{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        rand::random::<u32>(),
        format.extension()
    )
}

/// Whether `name` has the shape produced by [`new_dataset_id`].
pub(crate) fn is_dataset_id(name: &str) -> bool {
    let Ok(format) = FileFormat::from_path(name) else {
        return false;
    };
    let stem_len = name.len() - format.extension().len();
    name.get(..stem_len).is_some_and(|stem| DATASET_ID_STEM.is_match(stem))
}

/// Ids are plain file names inside the upload directory.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
}
