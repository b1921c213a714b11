//! Server-held temporary files for compressed images.
//!
//! A `TempFile` owns its file on disk and deletes it when dropped. The store
//! keeps each file until it is claimed by a download or expires; whoever
//! holds the guard last decides when the file disappears.

use crate::constants::{DOWNLOAD_EXTENSION, TEMP_NAME_PREFIX};
use crate::error::{CompressionError, Result};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct TempFile {
    name: String,
    path: PathBuf,
    created: Instant,
}

impl TempFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Deleted temporary file: {}", self.name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Error deleting temporary file {}: {}", self.name, e),
        }
    }
}

/// `compressed_<millis>_<8 hex>.jpg`. The random part keeps names unique when
/// two requests land in the same millisecond.
pub fn generate_temp_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}.{}",
        TEMP_NAME_PREFIX,
        millis,
        &suffix[..8],
        DOWNLOAD_EXTENSION
    )
}

#[derive(Debug)]
pub struct TempStore {
    dir: PathBuf,
    files: Mutex<HashMap<String, TempFile>>,
}

impl TempStore {
    /// Opens (creating if needed) the temp directory.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|_| CompressionError::DirectoryCreationFailed(dir.clone()))?;
        Ok(Self {
            dir,
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` under a fresh name. The returned guard is not yet
    /// registered: dropping it removes the file.
    pub fn write(&self, bytes: &[u8]) -> Result<TempFile> {
        let name = generate_temp_name();
        let path = self.dir.join(&name);
        fs::write(&path, bytes)?;
        Ok(TempFile {
            name,
            path,
            created: Instant::now(),
        })
    }

    /// Hands the file to the store so it survives until claimed or expired.
    pub fn register(&self, file: TempFile) -> String {
        let name = file.name.clone();
        self.lock().insert(name.clone(), file);
        name
    }

    /// Removes the file from the store, transferring ownership to the caller.
    /// Each file can be claimed once.
    pub fn claim(&self, name: &str) -> Option<TempFile> {
        self.lock().remove(name)
    }

    /// Path of a registered file without claiming it.
    pub fn peek_path(&self, name: &str) -> Option<PathBuf> {
        self.lock().get(name).map(|file| file.path.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops files older than `max_age`, returning how many were removed.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let expired: Vec<TempFile> = {
            let mut files = self.lock();
            let names: Vec<String> = files
                .iter()
                .filter(|(_, f)| f.age() >= max_age)
                .map(|(name, _)| name.clone())
                .collect();
            names.iter().filter_map(|n| files.remove(n)).collect()
        };
        let count = expired.len();
        if count > 0 {
            debug!("Expiring {} unclaimed temporary files", count);
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TempFile>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
