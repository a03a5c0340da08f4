//! Local profile photo cache.
//!
//! One JPEG per user, `profile_<uid>.jpg`, in a directory chosen by the
//! host app (typically the platform caches directory). The cache only
//! speeds up the edit screen; the stored object is authoritative.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::backend::UserId;
use crate::error::{CoreError, Result};

/// File-backed cache of profile photos.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Uses `dir` for cache files. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cached photo for `uid`.
    #[must_use]
    pub fn path_for(&self, uid: &UserId) -> PathBuf {
        self.dir.join(format!("profile_{uid}.jpg"))
    }

    /// Reads the cached photo, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self, uid: &UserId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(uid)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CoreError::Cache(err.to_string())),
        }
    }

    /// Replaces the cached photo atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn store(&self, uid: &UserId, jpeg: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::Cache(e.to_string()))?;
        let path = self.path_for(uid);
        let tmp = path.with_extension("jpg.tmp");
        fs::write(&tmp, jpeg).map_err(|e| CoreError::Cache(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CoreError::Cache(e.to_string())
        })?;
        debug!(uid = %uid, bytes = jpeg.len(), "Cached profile photo");
        Ok(())
    }

    /// Stores, logging instead of failing.
    pub fn store_best_effort(&self, uid: &UserId, jpeg: &[u8]) {
        if let Err(err) = self.store(uid, jpeg) {
            warn!(error = %err, uid = %uid, "Failed to cache profile photo");
        }
    }

    /// Removes the cached photo. Returns whether a file was removed.
    pub fn remove(&self, uid: &UserId) -> bool {
        match fs::remove_file(self.path_for(uid)) {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => {
                warn!(error = %err, uid = %uid, "Failed to remove cached profile photo");
                false
            }
        }
    }
}
