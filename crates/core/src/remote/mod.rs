//! Remote file host abstraction.
//!
//! Recordings live on a WebDAV file host. Paths handed to
//! [`RemoteFileClient::delete`], [`RemoteFileClient::download`] and
//! [`RemoteFileClient::create_share`] are relative to the user's file root
//! (`/{root_folder}{full_path}`); listed paths are relative to the listed root.

mod nextcloud;
mod propfind;
mod types;

pub use nextcloud::NextcloudClient;
pub use types::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by remote file host clients.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("File host unreachable: {0}")]
    Transport(String),

    #[error("File host request timed out")]
    Timeout,

    #[error("Remote file not found: {0}")]
    NotFound(String),

    #[error("Failed to create share: {0}")]
    ShareCreation(String),

    /// The host answered with something we could not interpret.
    #[error("Unexpected file host response: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Transport-level failures. A listing that fails this way says nothing
    /// about which files exist.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// Capability interface of the remote file host.
#[async_trait]
pub trait RemoteFileClient: Send + Sync {
    /// List everything below `root`, `depth` levels deep, directories included.
    async fn list(&self, root: &str, depth: u32) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Delete a file. Deleting a missing file succeeds.
    async fn delete(&self, path: &str) -> Result<(), RemoteError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Create a public read-only share link expiring on `expiry`.
    async fn create_share(&self, path: &str, expiry: NaiveDate) -> Result<String, RemoteError>;
}

/// Path of a catalog entry relative to the user's file root.
pub fn remote_path(root_folder: &str, full_path: &str) -> String {
    format!(
        "/{}/{}",
        root_folder.trim_matches('/'),
        full_path.trim_start_matches('/')
    )
}
