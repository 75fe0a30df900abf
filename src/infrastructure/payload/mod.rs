//! Content-addressed payload files
//!
//! One JSON file per distinct cached query, named by the query's
//! payload key. Files are write-once from the cache's point of view;
//! re-writing the same key (a duplicate insert) atomically replaces
//! the file with equivalent content.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::{CacheError, PayloadKey, PayloadRecord};

/// On-disk store of fetched result sets.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    dir: PathBuf,
}

impl PayloadStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &PayloadKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn exists(&self, key: &PayloadKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Publish a payload under its key.
    ///
    /// The record is written to a temp file and renamed into place, so
    /// a partially written payload is never visible under the final
    /// name.
    pub fn write(&self, key: &PayloadKey, record: &PayloadRecord) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| CacheError::io(format!("Failed to serialize payload: {}", e)))?;

        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{}.tmp", key.as_str()));
        fs::write(&tmp_path, &bytes)?;
        File::open(&tmp_path)?.sync_all()?;
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }

    /// Read the payload stored under `key`.
    pub fn read(&self, key: &PayloadKey) -> Result<PayloadRecord, CacheError> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::payload_not_found(key.as_str()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::corrupt(format!("payload {}: {}", key, e)))
    }
}
