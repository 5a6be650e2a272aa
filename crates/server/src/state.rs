use std::sync::Arc;

use mediastore_core::{
    Authenticator, CatalogStore, Config, InventorySynchronizer, Notifier, PaymentClient,
    PricingEngine, PurchasePipeline, PurchaseSettings, RemoteFileClient, RetentionPolicy,
    SalesStore, SanitizedConfig, SyncSettings, ThumbnailCache,
};

/// Stores and external clients the services are built from.
pub struct Backends {
    pub catalog: Arc<dyn CatalogStore>,
    pub sales: Arc<dyn SalesStore>,
    pub remote: Arc<dyn RemoteFileClient>,
    pub payments: Arc<dyn PaymentClient>,
    pub notifier: Arc<dyn Notifier>,
}

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    catalog: Arc<dyn CatalogStore>,
    sales: Arc<dyn SalesStore>,
    synchronizer: InventorySynchronizer,
    purchases: PurchasePipeline,
    pricing: PricingEngine,
    retention: RetentionPolicy,
}

impl AppState {
    pub fn new(config: Config, authenticator: Arc<dyn Authenticator>, backends: Backends) -> Self {
        let pricing = PricingEngine::new(config.pricing.clone());
        let retention = RetentionPolicy::new(config.retention.clone());

        let synchronizer = InventorySynchronizer::new(
            Arc::clone(&backends.remote),
            Arc::clone(&backends.catalog),
            Arc::clone(&backends.sales),
            Arc::clone(&backends.notifier),
            ThumbnailCache::new(config.store.thumbnail_dir.clone()),
            retention.clone(),
            pricing.clone(),
            SyncSettings::from_config(&config),
        );

        let purchases = PurchasePipeline::new(
            Arc::clone(&backends.catalog),
            Arc::clone(&backends.sales),
            backends.payments,
            backends.remote,
            backends.notifier,
            pricing.clone(),
            retention.clone(),
            PurchaseSettings::from_config(&config),
        );

        Self {
            config,
            authenticator,
            catalog: backends.catalog,
            sales: backends.sales,
            synchronizer,
            purchases,
            pricing,
            retention,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    pub fn sales(&self) -> &dyn SalesStore {
        self.sales.as_ref()
    }

    pub fn synchronizer(&self) -> &InventorySynchronizer {
        &self.synchronizer
    }

    pub fn purchases(&self) -> &PurchasePipeline {
        &self.purchases
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }
}
