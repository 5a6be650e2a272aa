use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::Config;
use crate::remote::RemoteError;
use crate::sales::SalesError;

/// Counts from one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// New rows inserted.
    pub added: u64,
    /// Existing rows seen again.
    pub updated: u64,
    /// Files deleted remotely because they aged out.
    pub expired: u64,
    /// Rows marked expired because their file vanished.
    pub removed: u64,
    /// Expired, unsold rows deleted from the catalog.
    pub purged: u64,
    /// Files rejected by the naming rules.
    pub skipped: u64,
    /// Share links cleared because they expired.
    pub shares_cleared: u64,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// The file host could not give a reliable answer. Nothing was changed.
    #[error("file host unavailable: {0}")]
    Transport(#[from] RemoteError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("sales error: {0}")]
    Sales(#[from] SalesError),
}

/// Settings a synchronizer needs, taken from the loaded config.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root_folder: String,
    pub depth: u32,
    pub content_types: Vec<String>,
    pub request_timeout: Duration,
    pub thumbnail_base_url: String,
    pub storefront_url: String,
    pub currency: String,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root_folder: config.remote.root_folder.clone(),
            depth: config.remote.depth,
            content_types: config.remote.content_types.clone(),
            request_timeout: Duration::from_secs(config.remote.timeout_secs as u64),
            thumbnail_base_url: config.store.thumbnail_base_url.clone(),
            storefront_url: config.store.storefront_url.clone(),
            currency: config.payment.currency.clone(),
        }
    }
}
