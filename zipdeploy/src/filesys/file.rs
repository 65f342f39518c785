//! File operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create an empty file with a unique name in the system temp directory
    ///
    /// The file is not removed automatically; wrap it in a [`ScopedFile`].
    pub fn create_temp(prefix: &str, suffix: &str) -> Result<Self, DeployError> {
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(std::io::Error::from)?;
        Ok(Self::new(path))
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DeployError> {
        Ok(fs::read(&self.path).await?)
    }
}

/// Owns a file path for the length of a scope and removes the file on drop.
///
/// Removal is best effort: a failure is logged and otherwise ignored, so it
/// never replaces the error that caused the scope to unwind.
#[derive(Debug)]
pub struct ScopedFile {
    file: File,
}

impl ScopedFile {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(self.file.path()) {
            Ok(()) => debug!("Removed {}", self.file.path().display()),
            Err(e) => debug!("Could not remove {}: {}", self.file.path().display(), e),
        }
    }
}
