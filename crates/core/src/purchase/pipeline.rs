use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::external::with_deadline;
use crate::metrics;
use crate::notify::{notify_quietly, Notification, NotificationKind, Notifier};
use crate::payment::{PaymentClient, PaymentError};
use crate::pricing::PricingEngine;
use crate::remote::{remote_path, RemoteError, RemoteFileClient};
use crate::retention::RetentionPolicy;
use crate::sales::{Finalization, NewSale, Sale, SalesStore};

use super::{CheckoutRedirect, PurchaseError, PurchaseSettings, SaleResult, ShareGrant};

const PAYMENT_SERVICE: &str = "payment_processor";
const REMOTE_SERVICE: &str = "file_host";

/// Drives a sale from checkout to share link.
///
/// Every step can be re-entered: cached product and price ids are reused,
/// and a confirmed sale is never provisioned twice.
pub struct PurchasePipeline {
    catalog: Arc<dyn CatalogStore>,
    sales: Arc<dyn SalesStore>,
    payments: Arc<dyn PaymentClient>,
    remote: Arc<dyn RemoteFileClient>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingEngine,
    retention: RetentionPolicy,
    settings: PurchaseSettings,
    /// Held while product and price ids are created and cached.
    provisioning: Mutex<()>,
}

impl PurchasePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        sales: Arc<dyn SalesStore>,
        payments: Arc<dyn PaymentClient>,
        remote: Arc<dyn RemoteFileClient>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingEngine,
        retention: RetentionPolicy,
        settings: PurchaseSettings,
    ) -> Self {
        Self {
            catalog,
            sales,
            payments,
            remote,
            notifier,
            pricing,
            retention,
            settings,
            provisioning: Mutex::new(()),
        }
    }

    /// Create a checkout session for a catalog entry and record a pending sale.
    pub async fn initiate_purchase(&self, catalog_id: i64) -> Result<CheckoutRedirect, PurchaseError> {
        let result = self.initiate(catalog_id).await;

        let label = match &result {
            Ok(_) => "success",
            Err(PurchaseError::NotFound(_)) => "not_found",
            Err(_) => "failed",
        };
        metrics::PURCHASES_INITIATED.with_label_values(&[label]).inc();
        if let Err(e) = &result {
            warn!(catalog_id, error = %e, "Purchase initiation failed");
        }

        result
    }

    /// Resolve a checkout session the buyer returned from.
    pub async fn confirm_purchase(&self, session_id: &str) -> Result<SaleResult, PurchaseError> {
        self.confirm_purchase_at(session_id, Utc::now()).await
    }

    /// [`confirm_purchase`](Self::confirm_purchase) as if it were `now`.
    pub async fn confirm_purchase_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SaleResult, PurchaseError> {
        let result = self.confirm(session_id, now).await;

        let label = match &result {
            Ok(SaleResult::Paid { duplicate: true, .. }) => "duplicate",
            Ok(SaleResult::Paid { .. }) => "paid",
            Ok(SaleResult::NotPaid { .. }) => "not_paid",
            Err(_) => "failed",
        };
        metrics::PURCHASES_CONFIRMED.with_label_values(&[label]).inc();
        if let Err(e) = &result {
            warn!(session_id, error = %e, "Purchase confirmation failed");
        }

        result
    }

    /// Issue a fresh share link for a confirmed sale.
    pub async fn renew_share(&self, sale_id: i64) -> Result<ShareGrant, PurchaseError> {
        self.renew_share_at(sale_id, Utc::now()).await
    }

    pub async fn renew_share_at(
        &self,
        sale_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ShareGrant, PurchaseError> {
        let sale = self.sales.get(sale_id)?;
        if !sale.is_confirmed() {
            return Err(PurchaseError::NotConfirmed(sale_id));
        }

        let entry = self.live_entry(sale.catalog_entry_id)?;
        let share_expiry = self.retention.share_expiry(self.retention.today(now));
        let share_link = self.create_share(&entry, share_expiry).await?;
        self.sales.update_share(sale_id, &share_link, share_expiry)?;

        info!(sale_id, path = %entry.full_path, %share_expiry, "Share link renewed");
        Ok(ShareGrant {
            sale_id,
            share_link,
            share_expiry,
        })
    }

    async fn initiate(&self, catalog_id: i64) -> Result<CheckoutRedirect, PurchaseError> {
        let entry = self.live_entry(catalog_id)?;
        let mode = self.settings.mode;
        let price_minor = self.pricing.price(entry.duration_minutes());

        let price_id = self.provision(catalog_id, price_minor).await?;

        let session = self
            .payment_call(
                "create_checkout_session",
                self.payments.create_checkout_session(
                    mode,
                    &price_id,
                    &self.settings.storefront_url,
                ),
            )
            .await?;

        let sale = self.sales.create(NewSale {
            catalog_entry_id: catalog_id,
            payment_session_id: session.session_id.clone(),
            mode,
            price_minor,
            currency: self.settings.currency.clone(),
        })?;

        info!(
            sale_id = sale.id,
            catalog_id,
            session_id = %session.session_id,
            %mode,
            "Checkout session created"
        );

        Ok(CheckoutRedirect {
            sale_id: sale.id,
            session_id: session.session_id,
            checkout_url: session.checkout_url,
        })
    }

    /// Make sure the entry has a product and a price, creating whichever is
    /// missing. Returns the price id.
    async fn provision(&self, catalog_id: i64, price_minor: i64) -> Result<String, PurchaseError> {
        let _guard = self.provisioning.lock().await;
        let mode = self.settings.mode;

        // re-read under the lock, a concurrent request may have cached ids
        let entry = self.catalog.get(catalog_id)?;

        // ids are only valid in the mode that created them
        let cached = entry.payment_ids(mode);

        let product_id = match cached.product_id.clone() {
            Some(id) => id,
            None => {
                let images: Vec<String> = vec![entry.thumbnail_url.clone()];
                let id = self
                    .payment_call(
                        "create_product",
                        self.payments.create_product(
                            mode,
                            &entry.file_name,
                            &entry.description,
                            &images,
                        ),
                    )
                    .await?;
                self.catalog.set_payment_product(catalog_id, mode, &id)?;
                info!(catalog_id, product_id = %id, %mode, "Payment product created");
                id
            }
        };

        match cached.price_id.clone() {
            Some(id) => Ok(id),
            None => {
                let id = self
                    .payment_call(
                        "create_price",
                        self.payments.create_price(
                            mode,
                            &product_id,
                            price_minor,
                            &self.settings.currency,
                        ),
                    )
                    .await?;
                self.catalog.set_payment_price(catalog_id, mode, &id)?;
                info!(catalog_id, price_id = %id, price_minor, %mode, "Payment price created");
                Ok(id)
            }
        }
    }

    async fn confirm(&self, session_id: &str, now: DateTime<Utc>) -> Result<SaleResult, PurchaseError> {
        let sale = self
            .sales
            .get_by_session(session_id)?
            .ok_or_else(|| PurchaseError::NotFound(format!("checkout session {}", session_id)))?;

        if sale.is_confirmed() {
            info!(sale_id = sale.id, session_id, "Sale already confirmed");
            return Ok(SaleResult::duplicate_of(&sale));
        }

        let status = self
            .payment_call("get_session", self.payments.get_session(sale.mode, session_id))
            .await?;
        if !status.is_paid_and_complete() {
            info!(
                sale_id = sale.id,
                payment_status = %status.payment_status,
                status = %status.status,
                "Checkout session not paid"
            );
            return Ok(SaleResult::NotPaid {
                sale_id: sale.id,
                payment_status: status.payment_status,
            });
        }

        let entry = self.catalog.get(sale.catalog_entry_id)?;
        let share_expiry = self.retention.share_expiry(self.retention.today(now));
        let share_link = self.create_share(&entry, share_expiry).await?;

        let finalization = Finalization {
            fullname: status.buyer_name.clone(),
            email: status.buyer_email.clone(),
            share_link: share_link.clone(),
            share_expiry,
            confirmed_at: now,
        };
        if !self.sales.finalize(session_id, &finalization)? {
            // another request confirmed it between our read and write
            let winner = self.sales.get(sale.id)?;
            info!(sale_id = sale.id, session_id, "Sale confirmed concurrently");
            return Ok(SaleResult::duplicate_of(&winner));
        }

        info!(sale_id = sale.id, path = %entry.full_path, %share_expiry, "Sale confirmed");
        self.notify_sale(&sale, &entry, &finalization).await;

        Ok(SaleResult::Paid {
            sale_id: sale.id,
            share_link: Some(share_link),
            share_expiry: Some(share_expiry),
            duplicate: false,
        })
    }

    /// An entry that can still be sold.
    fn live_entry(&self, catalog_id: i64) -> Result<CatalogEntry, PurchaseError> {
        let entry = self.catalog.get(catalog_id)?;
        if entry.is_expired() {
            return Err(PurchaseError::NotFound(format!(
                "catalog entry {} has expired",
                catalog_id
            )));
        }
        Ok(entry)
    }

    async fn create_share(
        &self,
        entry: &CatalogEntry,
        expiry: NaiveDate,
    ) -> Result<String, RemoteError> {
        let path = remote_path(&self.settings.root_folder, &entry.full_path);
        with_deadline(
            REMOTE_SERVICE,
            "create_share",
            self.settings.remote_timeout,
            self.remote.create_share(&path, expiry),
            || RemoteError::Timeout,
        )
        .await
    }

    async fn payment_call<T>(
        &self,
        operation: &str,
        call: impl std::future::Future<Output = Result<T, PaymentError>>,
    ) -> Result<T, PaymentError> {
        with_deadline(
            PAYMENT_SERVICE,
            operation,
            self.settings.payment_timeout,
            call,
            || PaymentError::Timeout,
        )
        .await
    }

    async fn notify_sale(&self, sale: &Sale, entry: &CatalogEntry, finalization: &Finalization) {
        let expiry = finalization.share_expiry.to_string();
        let mut variables = vec![
            ("buyer_name", finalization.fullname.clone().unwrap_or_default()),
            ("share_link", finalization.share_link.clone()),
            ("share_expiry", expiry),
            ("file_name", entry.file_name.clone()),
            ("sale_id", sale.id.to_string()),
        ];
        if let Some(email) = &finalization.email {
            variables.push(("buyer_email", email.clone()));
        }

        for kind in [
            NotificationKind::PurchaseConfirmationBuyer,
            NotificationKind::PurchaseConfirmationAdmin,
        ] {
            let notification = variables
                .iter()
                .fold(Notification::new(kind), |n, (name, value)| {
                    n.with(*name, value.clone())
                });
            notify_quietly(self.notifier.as_ref(), notification).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewCatalogEntry, SqliteCatalogStore};
    use crate::config::{PricingConfig, RetentionConfig};
    use crate::payment::PaymentMode;
    use crate::recording::RecordingName;
    use crate::sales::SqliteSalesStore;
    use crate::testing::{fixtures, MockNotifier, MockPaymentClient, MockRemoteFiles};
    use chrono::TimeZone;
    use std::time::Duration;

    struct Harness {
        catalog: Arc<SqliteCatalogStore>,
        sales: Arc<SqliteSalesStore>,
        payments: Arc<MockPaymentClient>,
        remote: Arc<MockRemoteFiles>,
        notifier: Arc<MockNotifier>,
        pipeline: PurchasePipeline,
    }

    fn settings() -> PurchaseSettings {
        PurchaseSettings {
            mode: PaymentMode::Test,
            currency: "hkd".to_string(),
            storefront_url: "http://localhost:8080/store".to_string(),
            root_folder: "recording".to_string(),
            payment_timeout: Duration::from_secs(5),
            remote_timeout: Duration::from_secs(5),
        }
    }

    fn harness() -> Harness {
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let sales = Arc::new(SqliteSalesStore::in_memory().unwrap());
        let payments = Arc::new(MockPaymentClient::new());
        let remote = Arc::new(MockRemoteFiles::new());
        let notifier = Arc::new(MockNotifier::new());

        let pipeline = PurchasePipeline::new(
            catalog.clone(),
            sales.clone(),
            payments.clone(),
            remote.clone(),
            notifier.clone(),
            PricingEngine::new(PricingConfig {
                base_price: 10_000,
                multiplier_window_minutes: 60,
                multiplier_increment: 2_000,
            }),
            RetentionPolicy::new(RetentionConfig::default()),
            settings(),
        );

        Harness {
            catalog,
            sales,
            payments,
            remote,
            notifier,
            pipeline,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
    }

    fn add_entry(h: &Harness, path: &str) -> CatalogEntry {
        let file = fixtures::remote_file(path);
        let name = RecordingName::parse(path.rsplit('/').next().unwrap()).unwrap();
        h.catalog
            .insert(NewCatalogEntry::from_remote(
                &file,
                &name,
                "http://localhost:8080/thumbs",
                now(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_initiate_creates_product_price_and_pending_sale() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");

        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        assert!(redirect.checkout_url.contains(&redirect.session_id));

        let products = h.payments.products().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "2024-03-01_20-00_22-30.mp4");
        assert_eq!(products[0].image_urls, vec![entry.thumbnail_url.clone()]);

        let prices = h.payments.prices().await;
        assert_eq!(prices.len(), 1);
        // 150 minutes: two full hours on top of the base price
        assert_eq!(prices[0].amount_minor, 14_000);

        let sale = h.sales.get(redirect.sale_id).unwrap();
        assert!(!sale.is_confirmed());
        assert_eq!(sale.price_minor, 14_000);
        assert_eq!(sale.mode, PaymentMode::Test);

        let stored = h.catalog.get(entry.id).unwrap();
        assert_eq!(
            stored.test_payment.product_id.as_deref(),
            Some(products[0].product_id.as_str())
        );
        assert_eq!(
            stored.test_payment.price_id.as_deref(),
            Some(prices[0].price_id.as_str())
        );
        assert_eq!(stored.live_payment.product_id, None);
    }

    #[tokio::test]
    async fn test_initiate_reuses_product_and_price() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");

        let first = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        let second = h.pipeline.initiate_purchase(entry.id).await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(h.payments.products().await.len(), 1);
        assert_eq!(h.payments.prices().await.len(), 1);
        assert_eq!(h.payments.sessions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_initiate_resumes_after_price_failure() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");

        // a product cached by an earlier attempt whose price call failed
        h.catalog
            .set_payment_product(entry.id, PaymentMode::Test, "prod_earlier")
            .unwrap();
        h.payments
            .set_next_error(PaymentError::Api {
                status: 500,
                message: "boom".into(),
            })
            .await;

        let result = h.pipeline.initiate_purchase(entry.id).await;
        assert!(matches!(result, Err(PurchaseError::PaymentProcessor(_))));
        assert!(h.sales.list(&Default::default()).unwrap().is_empty());

        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        assert!(h.sales.get(redirect.sale_id).is_ok());
        assert!(h.payments.products().await.is_empty());
        let prices = h.payments.prices().await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].product_id, "prod_earlier");
        let stored = h.catalog.get(entry.id).unwrap();
        assert_eq!(
            stored.test_payment.price_id.as_deref(),
            Some(prices[0].price_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_initiate_unknown_or_expired_entry() {
        let h = harness();
        assert!(matches!(
            h.pipeline.initiate_purchase(404).await,
            Err(PurchaseError::NotFound(_))
        ));

        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let mut changes = crate::catalog::SyncChangeSet::new(now());
        changes.expirations.push(entry.full_path.clone());
        h.catalog.apply_sync(&changes).unwrap();

        assert!(matches!(
            h.pipeline.initiate_purchase(entry.id).await,
            Err(PurchaseError::NotFound(_))
        ));
        assert!(h.payments.products().await.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_paid_session_provisions_share() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        h.payments
            .mark_paid(&redirect.session_id, "Ada Lovelace", "ada@example.com")
            .await;

        let result = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();
        let expected_expiry = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        match &result {
            SaleResult::Paid {
                share_link,
                share_expiry,
                duplicate,
                ..
            } => {
                assert!(!duplicate);
                assert_eq!(*share_expiry, Some(expected_expiry));
                assert!(share_link.is_some());
            }
            other => panic!("expected paid, got {:?}", other),
        }

        let shares = h.remote.shares().await;
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].path, "/recording/2024/2024-03-01_20-00_22-30.mp4");
        assert_eq!(shares[0].expiry, expected_expiry);

        let sale = h.sales.get(redirect.sale_id).unwrap();
        assert!(sale.is_confirmed());
        assert_eq!(sale.fullname.as_deref(), Some("Ada Lovelace"));
        assert_eq!(sale.email.as_deref(), Some("ada@example.com"));

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind, NotificationKind::PurchaseConfirmationBuyer);
        assert_eq!(sent[0].variable("buyer_email"), Some("ada@example.com"));
        assert_eq!(sent[1].kind, NotificationKind::PurchaseConfirmationAdmin);
    }

    #[tokio::test]
    async fn test_confirm_twice_is_duplicate() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        h.payments
            .mark_paid(&redirect.session_id, "Ada", "ada@example.com")
            .await;

        let first = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();
        let calls_after_first = h.payments.get_session_calls().await;
        let second = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();

        let (SaleResult::Paid { share_link: a, .. }, SaleResult::Paid { share_link: b, duplicate, .. }) =
            (first, second)
        else {
            panic!("both confirmations should be paid");
        };
        assert_eq!(a, b);
        assert!(duplicate);
        assert_eq!(h.remote.shares().await.len(), 1);
        assert_eq!(h.payments.get_session_calls().await, calls_after_first);
        assert_eq!(h.notifier.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn test_confirm_unpaid_leaves_sale_pending() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();

        let result = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();
        assert_eq!(
            result,
            SaleResult::NotPaid {
                sale_id: redirect.sale_id,
                payment_status: "unpaid".to_string(),
            }
        );
        assert!(!h.sales.get(redirect.sale_id).unwrap().is_confirmed());
        assert!(h.remote.shares().await.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_share_failure_is_retryable() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();
        h.payments
            .mark_paid(&redirect.session_id, "Ada", "ada@example.com")
            .await;

        h.remote
            .set_next_error(RemoteError::ShareCreation("quota".into()))
            .await;
        let result = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await;
        assert!(matches!(result, Err(PurchaseError::Transport(_))));
        assert!(!h.sales.get(redirect.sale_id).unwrap().is_confirmed());

        let retry = h
            .pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();
        assert!(retry.is_paid());
    }

    #[tokio::test]
    async fn test_confirm_unknown_session() {
        let h = harness();
        let result = h.pipeline.confirm_purchase_at("cs_missing", now()).await;
        assert!(matches!(result, Err(PurchaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_renew_share_replaces_link() {
        let h = harness();
        let entry = add_entry(&h, "/2024/2024-03-01_20-00_22-30.mp4");
        let redirect = h.pipeline.initiate_purchase(entry.id).await.unwrap();

        assert!(matches!(
            h.pipeline.renew_share_at(redirect.sale_id, now()).await,
            Err(PurchaseError::NotConfirmed(_))
        ));

        h.payments
            .mark_paid(&redirect.session_id, "Ada", "ada@example.com")
            .await;
        h.pipeline
            .confirm_purchase_at(&redirect.session_id, now())
            .await
            .unwrap();

        let later = now() + chrono::Duration::days(10);
        let grant = h.pipeline.renew_share_at(redirect.sale_id, later).await.unwrap();
        assert_eq!(grant.share_expiry, NaiveDate::from_ymd_opt(2024, 4, 11).unwrap());

        let sale = h.sales.get(redirect.sale_id).unwrap();
        assert_eq!(sale.share_link, Some(grant.share_link));
        assert_eq!(sale.share_expiry, Some(grant.share_expiry));
        assert_eq!(h.remote.shares().await.len(), 2);
    }
}
