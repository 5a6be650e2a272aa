pub mod auth;
pub mod catalog;
pub mod config;
mod db;
mod external;
pub mod metrics;
pub mod notify;
pub mod payment;
pub mod pricing;
pub mod purchase;
pub mod recording;
pub mod remote;
pub mod retention;
pub mod sales;
pub mod sync;
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, OpenAccess,
    Operator,
};
pub use catalog::{CatalogEntry, CatalogError, CatalogStats, CatalogStore, SqliteCatalogStore};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use notify::{create_notifier, Notification, NotificationKind, Notifier, NotifyError};
pub use payment::{PaymentClient, PaymentError, PaymentMode, StripeClient};
pub use pricing::PricingEngine;
pub use purchase::{
    CheckoutRedirect, PurchaseError, PurchasePipeline, PurchaseSettings, SaleResult, ShareGrant,
};
pub use remote::{NextcloudClient, RemoteError, RemoteFile, RemoteFileClient};
pub use retention::RetentionPolicy;
pub use sales::{Sale, SaleFilter, SaleStatus, SalesError, SalesStore, SqliteSalesStore};
pub use sync::{InventorySynchronizer, SyncError, SyncReport, SyncSettings, ThumbnailCache};
