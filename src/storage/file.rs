use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{FeedwatchError, FeedwatchResult};
use crate::storage::traits::StateStore;

/// State store backed by a single JSON file. Writes go through a sibling
/// temp file and a rename so a crash mid-write leaves the previous document
/// intact.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> FeedwatchResult<Vec<u8>> {
        if !self.path.exists() {
            // First run: nothing persisted yet.
            return Ok(Vec::new());
        }
        fs::read(&self.path).map_err(|e| FeedwatchError::StateLoad(e.to_string()))
    }

    fn save(&self, bytes: &[u8]) -> FeedwatchResult<()> {
        let temp = self.temp_path();
        fs::write(&temp, bytes).map_err(|e| FeedwatchError::StateSave(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| FeedwatchError::StateSave(e.to_string()))
    }
}
