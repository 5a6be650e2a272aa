//! The inventory synchronizer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogEntry, CatalogStore, NewCatalogEntry, SyncChangeSet};
use crate::external::with_deadline;
use crate::metrics;
use crate::notify::{notify_quietly, Notification, NotificationKind, Notifier};
use crate::pricing::{format_amount, PricingEngine};
use crate::recording::{split_path, RecordingName};
use crate::remote::{remote_path, RemoteError, RemoteFile, RemoteFileClient};
use crate::retention::RetentionPolicy;
use crate::sales::SalesStore;

use super::{SyncError, SyncReport, SyncSettings, ThumbnailCache, ThumbnailError};

const SERVICE: &str = "file_host";

/// Mirrors the remote file listing into the catalog.
pub struct InventorySynchronizer {
    remote: Arc<dyn RemoteFileClient>,
    catalog: Arc<dyn CatalogStore>,
    sales: Arc<dyn SalesStore>,
    notifier: Arc<dyn Notifier>,
    thumbnails: ThumbnailCache,
    retention: RetentionPolicy,
    pricing: PricingEngine,
    settings: SyncSettings,
}

/// Outcome of planning one listed file.
enum FilePlan {
    Duplicate,
    Skip,
    Delete,
    Insert(Box<NewCatalogEntry>),
    Touch,
}

impl InventorySynchronizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote: Arc<dyn RemoteFileClient>,
        catalog: Arc<dyn CatalogStore>,
        sales: Arc<dyn SalesStore>,
        notifier: Arc<dyn Notifier>,
        thumbnails: ThumbnailCache,
        retention: RetentionPolicy,
        pricing: PricingEngine,
        settings: SyncSettings,
    ) -> Self {
        Self {
            remote,
            catalog,
            sales,
            notifier,
            thumbnails,
            retention,
            pricing,
            settings,
        }
    }

    /// Run one sync pass against the current clock.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        self.sync_at(Utc::now()).await
    }

    /// Run one sync pass as if it were `now`.
    pub async fn sync_at(&self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let result = self.run_pass(now).await;

        let label = match &result {
            Ok(_) => "success",
            Err(SyncError::Transport(_)) => "transport_error",
            Err(_) => "failed",
        };
        metrics::SYNC_PASSES.with_label_values(&[label]).inc();
        metrics::SYNC_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                for (outcome, count) in [
                    ("added", report.added),
                    ("updated", report.updated),
                    ("expired", report.expired),
                    ("removed", report.removed),
                    ("purged", report.purged),
                    ("skipped", report.skipped),
                ] {
                    metrics::SYNC_FILES.with_label_values(&[outcome]).inc_by(count);
                }
                info!(
                    added = report.added,
                    updated = report.updated,
                    expired = report.expired,
                    removed = report.removed,
                    purged = report.purged,
                    skipped = report.skipped,
                    shares_cleared = report.shares_cleared,
                    "Sync pass complete"
                );
            }
            Err(e) => error!(error = %e, "Sync pass aborted"),
        }

        result
    }

    /// Clear share links that expired before `today`.
    pub fn cleanup_expired_shares(&self, today: NaiveDate) -> Result<u64, SyncError> {
        let cleared = self.sales.clear_expired_shares(today)?;
        if cleared > 0 {
            info!(cleared, "Cleared expired share links");
        }
        Ok(cleared)
    }

    async fn run_pass(&self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        let today = self.retention.today(now);

        let files: Vec<RemoteFile> = self
            .list_remote()
            .await?
            .into_iter()
            .filter(|f| f.matches_content_types(&self.settings.content_types))
            .collect();
        debug!(count = files.len(), "Remote files after filtering");

        let mut report = SyncReport {
            shares_cleared: self.cleanup_expired_shares(today)?,
            ..Default::default()
        };

        let snapshot: HashMap<String, CatalogEntry> = self
            .catalog
            .list_all()?
            .into_iter()
            .map(|e| (e.full_path.clone(), e))
            .collect();

        let mut changes = SyncChangeSet::new(now);
        let mut touched: HashSet<String> = HashSet::new();
        let mut deletions: Vec<String> = Vec::new();

        for file in &files {
            let existing = snapshot.get(&file.path);
            match self.plan_file(file, existing, &mut touched, now, today)? {
                FilePlan::Duplicate => {}
                FilePlan::Skip => report.skipped += 1,
                FilePlan::Delete => {
                    deletions.push(file.path.clone());
                    if existing.is_some() {
                        changes.expirations.push(file.path.clone());
                    }
                    report.expired += 1;
                }
                FilePlan::Insert(entry) => changes.inserts.push(*entry),
                FilePlan::Touch => {
                    changes.touches.push(file.path.clone());
                    report.updated += 1;
                }
            }
        }

        for (path, entry) in &snapshot {
            if touched.contains(path) {
                continue;
            }
            if entry.expired.is_none() {
                debug!(path = %path, "Recording vanished from file host");
                changes.expirations.push(path.clone());
                report.removed += 1;
            } else if self.sales.count_for_entry(entry.id)? == 0 {
                debug!(path = %path, "Purging expired recording");
                changes.purges.push(entry.id);
                report.purged += 1;
            }
        }

        for path in &deletions {
            self.delete_remote(path).await?;
        }

        let inserted_ids = self.catalog.apply_sync(&changes)?;
        report.added = inserted_ids.len() as u64;
        // inserts that lost a race with a concurrent pass became touches
        report.updated += (changes.inserts.len() - inserted_ids.len()) as u64;

        for id in &inserted_ids {
            match self.catalog.get(*id) {
                Ok(entry) => {
                    notify_quietly(self.notifier.as_ref(), self.new_recording_notification(&entry))
                        .await
                }
                Err(e) => warn!(id, error = %e, "Inserted recording not readable"),
            }
        }

        let live_paths = changes
            .inserts
            .iter()
            .map(|e| e.full_path.as_str())
            .chain(changes.touches.iter().map(String::as_str));
        for full_path in live_paths {
            if let Err(e) = self.fetch_thumbnail(full_path).await {
                warn!(path = %full_path, error = %e, "Thumbnail not cached");
            }
        }

        Ok(report)
    }

    fn plan_file(
        &self,
        file: &RemoteFile,
        existing: Option<&CatalogEntry>,
        touched: &mut HashSet<String>,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<FilePlan, SyncError> {
        if !touched.insert(file.path.clone()) {
            debug!(path = %file.path, "Duplicate listing entry");
            return Ok(FilePlan::Duplicate);
        }

        if file.path.contains(' ') {
            warn!(path = %file.path, "Skipping file with a space in its path");
            return Ok(FilePlan::Skip);
        }

        let (folder, file_name) = split_path(&file.path);
        if folder == "/" {
            debug!(path = %file.path, "Skipping file in the root folder");
            return Ok(FilePlan::Skip);
        }

        let name = match RecordingName::parse(&file_name) {
            Ok(name) => name,
            Err(e) => {
                warn!(path = %file.path, error = %e, "Skipping malformed recording name");
                return Ok(FilePlan::Skip);
            }
        };

        if self.retention.is_file_expired(name.start_date, now)
            && !self.has_active_share(existing, today)?
        {
            info!(path = %file.path, "Recording past retention, deleting");
            return Ok(FilePlan::Delete);
        }

        match existing {
            None => {
                debug!(path = %file.path, "New recording");
                Ok(FilePlan::Insert(Box::new(NewCatalogEntry::from_remote(
                    file,
                    &name,
                    &self.settings.thumbnail_base_url,
                    now,
                ))))
            }
            Some(_) => Ok(FilePlan::Touch),
        }
    }

    fn has_active_share(
        &self,
        existing: Option<&CatalogEntry>,
        today: NaiveDate,
    ) -> Result<bool, SyncError> {
        match existing {
            Some(entry) => Ok(self.sales.has_active_share(entry.id, today)?),
            None => Ok(false),
        }
    }

    async fn list_remote(&self) -> Result<Vec<RemoteFile>, RemoteError> {
        with_deadline(
            SERVICE,
            "list",
            self.settings.request_timeout,
            self.remote
                .list(&self.settings.root_folder, self.settings.depth),
            || RemoteError::Timeout,
        )
        .await
    }

    async fn delete_remote(&self, full_path: &str) -> Result<(), RemoteError> {
        let path = remote_path(&self.settings.root_folder, full_path);
        with_deadline(
            SERVICE,
            "delete",
            self.settings.request_timeout,
            self.remote.delete(&path),
            || RemoteError::Timeout,
        )
        .await
    }

    /// Download `{full_path}.jpg` into the cache unless it is already there.
    async fn fetch_thumbnail(&self, full_path: &str) -> Result<(), ThumbnailError> {
        if self.thumbnails.contains(full_path).await {
            return Ok(());
        }

        let path = remote_path(
            &self.settings.root_folder,
            &format!("{}.jpg", full_path),
        );
        let bytes = with_deadline(
            SERVICE,
            "download",
            self.settings.request_timeout,
            self.remote.download(&path),
            || RemoteError::Timeout,
        )
        .await?;

        self.thumbnails.store(full_path, &bytes).await?;
        debug!(path = %full_path, "Thumbnail cached");
        Ok(())
    }

    fn new_recording_notification(&self, entry: &CatalogEntry) -> Notification {
        let price = self.pricing.price(entry.duration_minutes());
        let separator = if self.settings.storefront_url.contains('?') {
            '&'
        } else {
            '?'
        };

        Notification::new(NotificationKind::NewRecordingAdmin)
            .with(
                "video_datetime",
                format!(
                    "{}, {} and lasted until {}",
                    entry.start_date,
                    entry.start_time.format("%H:%M:%S"),
                    entry.end_time.format("%H:%M:%S")
                ),
            )
            .with("video_price", format_amount(price, &self.settings.currency))
            .with("thumbnail_link", entry.thumbnail_url.clone())
            .with(
                "purchase_link",
                format!("{}{}id={}", self.settings.storefront_url, separator, entry.id),
            )
            .with("file_name", entry.file_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::config::{PricingConfig, RetentionConfig};
    use crate::sales::SqliteSalesStore;
    use crate::testing::{fixtures, MockNotifier, MockRemoteFiles};
    use chrono::TimeZone;
    use std::time::Duration;

    struct Harness {
        remote: Arc<MockRemoteFiles>,
        catalog: Arc<SqliteCatalogStore>,
        notifier: Arc<MockNotifier>,
        synchronizer: InventorySynchronizer,
        _thumbs: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let remote = Arc::new(MockRemoteFiles::new());
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let sales = Arc::new(SqliteSalesStore::in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let thumbs = tempfile::tempdir().unwrap();

        let synchronizer = InventorySynchronizer::new(
            remote.clone(),
            catalog.clone(),
            sales,
            notifier.clone(),
            ThumbnailCache::new(thumbs.path()),
            RetentionPolicy::new(RetentionConfig::default()),
            PricingEngine::new(PricingConfig::default()),
            fixtures::sync_settings(Duration::from_secs(5)),
        );

        Harness {
            remote,
            catalog,
            notifier,
            synchronizer,
            _thumbs: thumbs,
        }
    }

    fn march_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_new_file_is_inserted_and_announced() {
        let h = harness();
        h.remote
            .add_file(fixtures::remote_file("/2024/2024-03-01_20-00_22-30.mp4"))
            .await;

        let report = h.synchronizer.sync_at(march_2024()).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.updated, 0);

        let entry = h
            .catalog
            .get_by_path("/2024/2024-03-01_20-00_22-30.mp4")
            .unwrap()
            .unwrap();
        assert_eq!(entry.verified, march_2024());

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::NewRecordingAdmin);
        assert_eq!(
            sent[0].variable("video_datetime"),
            Some("2024-03-01, 20:00:00 and lasted until 22:30:00")
        );
        assert_eq!(
            sent[0].variable("purchase_link").map(str::to_string),
            Some(format!("http://localhost:8080/store?id={}", entry.id))
        );
    }

    #[tokio::test]
    async fn test_root_folder_and_wrong_type_ignored() {
        let h = harness();
        h.remote
            .add_file(fixtures::remote_file("/2024-03-01_20-00_22-30.mp4"))
            .await;
        let mut image = fixtures::remote_file("/2024/2024-03-01_20-00_22-30.jpg");
        image.content_type = "image/jpeg".to_string();
        h.remote.add_file(image).await;

        let report = h.synchronizer.sync_at(march_2024()).await.unwrap();
        assert_eq!(report.added, 0);
        // the jpg is filtered by content type before it is counted
        assert_eq!(report.skipped, 1);
        assert!(h.catalog.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_thumbnail_cached_after_insert() {
        let h = harness();
        h.remote
            .add_file(fixtures::remote_file("/2024/2024-03-01_20-00_22-30.mp4"))
            .await;
        h.remote
            .set_content(
                "/recording/2024/2024-03-01_20-00_22-30.mp4.jpg",
                b"jpeg".to_vec(),
            )
            .await;

        h.synchronizer.sync_at(march_2024()).await.unwrap();
        assert!(
            h.synchronizer
                .thumbnails
                .contains("/2024/2024-03-01_20-00_22-30.mp4")
                .await
        );
    }

    #[tokio::test]
    async fn test_missing_thumbnail_is_not_fatal() {
        let h = harness();
        h.remote
            .add_file(fixtures::remote_file("/2024/2024-03-01_20-00_22-30.mp4"))
            .await;

        let report = h.synchronizer.sync_at(march_2024()).await.unwrap();
        assert_eq!(report.added, 1);
    }
}
