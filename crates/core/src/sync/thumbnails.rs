//! Local cache of recording thumbnails.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recording::thumbnail_key;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("thumbnail download failed: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    #[error("thumbnail write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Thumbnails stored as `{dir}/{md5(full_path)}.jpg`.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, full_path: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", thumbnail_key(full_path)))
    }

    pub async fn contains(&self, full_path: &str) -> bool {
        tokio::fs::try_exists(self.path_for(full_path))
            .await
            .unwrap_or(false)
    }

    /// Write thumbnail bytes for a recording.
    pub async fn store(&self, full_path: &str, bytes: &[u8]) -> Result<PathBuf, ThumbnailError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(full_path);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
