//! Types for the recording catalog.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payment::PaymentMode;
use crate::recording::{human_size, split_path, thumbnail_key, RecordingName};
use crate::remote::RemoteFile;

/// A remote recording mirrored into the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    /// Path below the remote root, starting with `/`. Unique.
    pub full_path: String,
    pub file_name: String,
    /// Parent folder of `full_path`.
    pub folder: String,
    /// Human-readable size, e.g. "1.5 GB".
    pub size: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Thumbnail location on the remote host.
    pub thumbnail_path: String,
    /// Public URL of the cached thumbnail.
    pub thumbnail_url: String,
    /// Processor ids cached by the purchase pipeline, one set per mode.
    #[serde(default)]
    pub test_payment: PaymentIds,
    #[serde(default)]
    pub live_payment: PaymentIds,
    /// Last sync pass that saw the file.
    pub verified: DateTime<Utc>,
    /// Set once the file is gone or aged out.
    #[serde(default)]
    pub expired: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn is_expired(&self) -> bool {
        self.expired.is_some()
    }

    pub fn payment_ids(&self, mode: PaymentMode) -> &PaymentIds {
        match mode {
            PaymentMode::Test => &self.test_payment,
            PaymentMode::Live => &self.live_payment,
        }
    }

    /// Recording length in minutes, wrapping past midnight.
    pub fn duration_minutes(&self) -> u32 {
        RecordingName {
            start_date: self.start_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
        .duration_minutes()
    }
}

/// Product and price created for an entry in one payment mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIds {
    pub product_id: Option<String>,
    pub price_id: Option<String>,
}

/// A catalog row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub full_path: String,
    pub file_name: String,
    pub folder: String,
    pub size: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub thumbnail_path: String,
    pub thumbnail_url: String,
    pub verified: DateTime<Utc>,
}

impl NewCatalogEntry {
    /// Derive every catalog field from a listed file and its parsed name.
    pub fn from_remote(
        file: &RemoteFile,
        name: &RecordingName,
        thumbnail_base_url: &str,
        verified: DateTime<Utc>,
    ) -> Self {
        let (folder, file_name) = split_path(&file.path);
        Self {
            full_path: file.path.clone(),
            file_name,
            folder,
            size: human_size(file.size_bytes),
            size_bytes: file.size_bytes,
            content_type: file.content_type.clone(),
            description: name.description(),
            start_date: name.start_date,
            start_time: name.start_time,
            end_time: name.end_time,
            thumbnail_path: format!("{}.jpg", file.path),
            thumbnail_url: format!(
                "{}/{}.jpg",
                thumbnail_base_url.trim_end_matches('/'),
                thumbnail_key(&file.path)
            ),
            verified,
        }
    }
}

/// Everything one sync pass changes, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct SyncChangeSet {
    /// Pass timestamp, written to touched and inserted rows.
    pub verified: DateTime<Utc>,
    pub inserts: Vec<NewCatalogEntry>,
    /// Paths seen this pass. Their `verified` is refreshed and `expired`
    /// cleared.
    pub touches: Vec<String>,
    /// Paths to mark expired. Rows already expired keep their timestamp.
    pub expirations: Vec<String>,
    /// Row ids to delete.
    pub purges: Vec<i64>,
}

impl SyncChangeSet {
    pub fn new(verified: DateTime<Utc>) -> Self {
        Self {
            verified,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.touches.is_empty()
            && self.expirations.is_empty()
            && self.purges.is_empty()
    }
}

/// Catalog statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_entries: u64,
    pub active_entries: u64,
    pub expired_entries: u64,
    /// Bytes held by active entries.
    pub active_size_bytes: u64,
    /// Entries with a payment product attached in either mode.
    pub with_payment_product: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_recording: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_recording: Option<NaiveDate>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already in catalog: {0}")]
    Duplicate(String),
}
