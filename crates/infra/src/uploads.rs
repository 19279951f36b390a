//! Photo file storage.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("problem with file upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Where uploaded photos end up.
#[async_trait::async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Persist `bytes` under `file_name`, replacing any previous file.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Directory the stored files are served from.
    fn root(&self) -> &Path;
}

/// Stores photos as plain files in a single directory.
#[derive(Debug, Clone)]
pub struct FsPhotoStorage {
    root: PathBuf,
}

impl FsPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl PhotoStorage for FsPhotoStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let is_plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !is_plain {
            return Err(StorageError::InvalidName(file_name.to_string()));
        }

        tokio::fs::create_dir_all(&self.root).await?;

        // Each write gets its own temp file, renamed over the target once
        // complete. A failed write leaves nothing behind.
        let root = self.root.clone();
        let target = self.root.join(file_name);
        let bytes_owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".upload-")
                .tempfile_in(&root)?;
            tmp.write_all(&bytes_owned)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        tracing::debug!(file = %file_name, bytes = bytes.len(), "stored photo");
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
