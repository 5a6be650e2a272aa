//! Mock remote file host for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::remote::{RemoteError, RemoteFile, RemoteFileClient};

/// A recorded create_share call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedShare {
    pub path: String,
    pub expiry: NaiveDate,
    pub url: String,
}

/// Mock implementation of the RemoteFileClient trait.
///
/// Provides controllable behavior for testing:
/// - A mutable listing
/// - Downloadable content by path
/// - Recorded deletes and shares
/// - One-shot failures and a slow listing
///
/// Listed paths are relative to the listed root; delete/download/share paths
/// carry the root folder, as with the real client.
#[derive(Debug, Default)]
pub struct MockRemoteFiles {
    files: Arc<RwLock<Vec<RemoteFile>>>,
    contents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    deleted: Arc<RwLock<Vec<String>>>,
    shares: Arc<RwLock<Vec<RecordedShare>>>,
    list_calls: Arc<RwLock<u32>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<RemoteError>>>,
    /// If set, the next delete will fail with this error.
    delete_error: Arc<RwLock<Option<RemoteError>>>,
    list_delay: Arc<RwLock<Option<Duration>>>,
}

impl MockRemoteFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_file(&self, file: RemoteFile) {
        self.files.write().await.push(file);
    }

    pub async fn set_files(&self, files: Vec<RemoteFile>) {
        *self.files.write().await = files;
    }

    /// Drop a file from the listing, as if removed out of band.
    pub async fn remove_file(&self, path: &str) {
        self.files.write().await.retain(|f| f.path != path);
    }

    pub async fn set_content(&self, path: &str, bytes: Vec<u8>) {
        self.contents.write().await.insert(path.to_string(), bytes);
    }

    pub async fn set_next_error(&self, error: RemoteError) {
        *self.next_error.write().await = Some(error);
    }

    /// Fail the next delete only, leaving listings alone.
    pub async fn set_delete_error(&self, error: RemoteError) {
        *self.delete_error.write().await = Some(error);
    }

    /// Make every listing take this long.
    pub async fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.write().await = Some(delay);
    }

    pub async fn deleted_paths(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }

    pub async fn shares(&self) -> Vec<RecordedShare> {
        self.shares.read().await.clone()
    }

    pub async fn list_calls(&self) -> u32 {
        *self.list_calls.read().await
    }

    async fn take_error(&self) -> Option<RemoteError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl RemoteFileClient for MockRemoteFiles {
    async fn list(&self, _root: &str, _depth: u32) -> Result<Vec<RemoteFile>, RemoteError> {
        *self.list_calls.write().await += 1;

        let delay = *self.list_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self.files.read().await.clone())
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        if let Some(error) = self.delete_error.write().await.take() {
            return Err(error);
        }
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.deleted.write().await.push(path.to_string());
        // listing paths lack the root folder segment
        self.files.write().await.retain(|f| !path.ends_with(&f.path));
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.contents
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    async fn create_share(&self, path: &str, expiry: NaiveDate) -> Result<String, RemoteError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut shares = self.shares.write().await;
        let url = format!("https://cloud.example.com/s/share{}", shares.len() + 1);
        shares.push(RecordedShare {
            path: path.to_string(),
            expiry,
            url: url.clone(),
        });
        Ok(url)
    }
}
