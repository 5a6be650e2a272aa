use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::payment::PaymentMode;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the admin routes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when method = "api_key"
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediastore.db")
}

/// Remote file host (Nextcloud WebDAV) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Base URL of the file host (e.g., "https://cloud.example.com/")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Root folder of the recordings, no leading or trailing slashes
    #[serde(default = "default_root_folder")]
    pub root_folder: String,
    /// How many folder levels to scan below the root
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Content types to mirror. Empty = every file.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_root_folder() -> String {
    "recording".to_string()
}

fn default_depth() -> u32 {
    4
}

fn default_content_types() -> Vec<String> {
    vec!["video/mp4".to_string()]
}

fn default_timeout() -> u32 {
    30
}

/// Payment processor (Stripe) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    /// Which processor environment new sales are created in
    #[serde(default)]
    pub mode: PaymentMode,
    #[serde(default)]
    pub live_secret_key: Option<String>,
    #[serde(default)]
    pub test_secret_key: Option<String>,
    /// ISO currency code, lowercase (e.g., "hkd")
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Shown on the buyer's card statement, at most 22 characters
    #[serde(default = "default_statement_descriptor")]
    pub statement_descriptor: String,
    #[serde(default = "default_payment_api")]
    pub api_base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            mode: PaymentMode::default(),
            live_secret_key: None,
            test_secret_key: None,
            currency: default_currency(),
            statement_descriptor: default_statement_descriptor(),
            api_base_url: default_payment_api(),
            timeout_secs: default_timeout(),
        }
    }
}

impl PaymentConfig {
    /// Secret key for the given mode, if configured.
    pub fn secret_key(&self, mode: PaymentMode) -> Option<&str> {
        match mode {
            PaymentMode::Live => self.live_secret_key.as_deref(),
            PaymentMode::Test => self.test_secret_key.as_deref(),
        }
        .filter(|k| !k.is_empty())
    }
}

fn default_currency() -> String {
    "hkd".to_string()
}

fn default_statement_descriptor() -> String {
    "Media sales".to_string()
}

fn default_payment_api() -> String {
    "https://api.stripe.com/v1".to_string()
}

/// Pricing rules, all amounts in minor currency units (cents)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PricingConfig {
    #[serde(default = "default_base_price")]
    pub base_price: i64,
    /// Length of one billing step in minutes. 0 disables the multiplier.
    #[serde(default = "default_multiplier_window")]
    pub multiplier_window_minutes: u32,
    /// Amount added for every full billing step
    #[serde(default)]
    pub multiplier_increment: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: default_base_price(),
            multiplier_window_minutes: default_multiplier_window(),
            multiplier_increment: 0,
        }
    }
}

fn default_base_price() -> i64 {
    50_000
}

fn default_multiplier_window() -> u32 {
    60
}

/// Retention windows, counted in whole calendar days on the site clock
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Days after the recording date before an unshared file is deleted remotely
    #[serde(default = "default_retention_days")]
    pub file_cleanup_days: u32,
    /// Days a purchased share link stays valid
    #[serde(default = "default_retention_days")]
    pub share_lifetime_days: u32,
    /// Site clock as minutes east of UTC. 0 keeps calendar days in UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            file_cleanup_days: default_retention_days(),
            share_lifetime_days: default_retention_days(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

/// Storefront presentation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Public page buyers return to after checkout
    #[serde(default = "default_storefront_url")]
    pub storefront_url: String,
    /// Local directory holding downloaded thumbnails
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: PathBuf,
    /// Public URL prefix the thumbnail directory is served under
    #[serde(default = "default_thumbnail_base_url")]
    pub thumbnail_base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storefront_url: default_storefront_url(),
            thumbnail_dir: default_thumbnail_dir(),
            thumbnail_base_url: default_thumbnail_base_url(),
        }
    }
}

fn default_storefront_url() -> String {
    "http://localhost:8080/store".to_string()
}

fn default_thumbnail_dir() -> PathBuf {
    PathBuf::from("thumbs")
}

fn default_thumbnail_base_url() -> String {
    "http://localhost:8080/thumbs".to_string()
}

/// Notification settings. Without `smtp`, notifications are only logged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Receives new-recording and sale notices
    #[serde(default)]
    pub admin_email: Option<String>,
    /// Sender address
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub templates: NotificationTemplates,
}

/// SMTP relay settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// One subject/body pair. `{{name}}` placeholders are filled from the
/// notification variables.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationTemplates {
    #[serde(default = "default_new_recording_template")]
    pub new_recording_admin: MessageTemplate,
    #[serde(default = "default_buyer_template")]
    pub purchase_confirmation_buyer: MessageTemplate,
    #[serde(default = "default_sale_admin_template")]
    pub purchase_confirmation_admin: MessageTemplate,
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self {
            new_recording_admin: default_new_recording_template(),
            purchase_confirmation_buyer: default_buyer_template(),
            purchase_confirmation_admin: default_sale_admin_template(),
        }
    }
}

fn default_new_recording_template() -> MessageTemplate {
    MessageTemplate {
        subject: "New video recorded: {{video_datetime}}".to_string(),
        body: "A new recording is online. It started on {{video_datetime}}.\n\
               Price: {{video_price}}\n\
               Thumbnail: {{thumbnail_link}}\n\
               Purchase: {{purchase_link}}\n"
            .to_string(),
    }
}

fn default_buyer_template() -> MessageTemplate {
    MessageTemplate {
        subject: "Your media purchase".to_string(),
        body: "Dear {{buyer_name}},\n\n\
               You can now download the file here: {{share_link}}\n\
               This link will be active until {{share_expiry}}. \
               Please download it as soon as possible.\n"
            .to_string(),
    }
}

fn default_sale_admin_template() -> MessageTemplate {
    MessageTemplate {
        subject: "Recording sold: {{file_name}}".to_string(),
        body: "{{buyer_name}} <{{buyer_email}}> bought {{file_name}}.\n\
               Share link: {{share_link}} (valid until {{share_expiry}})\n"
            .to_string(),
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub remote: SanitizedRemoteConfig,
    pub payment: SanitizedPaymentConfig,
    pub pricing: PricingConfig,
    pub retention: RetentionConfig,
    pub store: StoreConfig,
    pub notifications: SanitizedNotificationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Remote config with the password hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub root_folder: String,
    pub depth: u32,
    pub content_types: Vec<String>,
    pub timeout_secs: u32,
}

/// Payment config with the secret keys hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPaymentConfig {
    pub mode: PaymentMode,
    pub live_key_configured: bool,
    pub test_key_configured: bool,
    pub currency: String,
    pub statement_descriptor: String,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationConfig {
    pub admin_email: Option<String>,
    pub smtp_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            remote: SanitizedRemoteConfig {
                url: config.remote.url.clone(),
                username: config.remote.username.clone(),
                password_configured: !config.remote.password.is_empty(),
                root_folder: config.remote.root_folder.clone(),
                depth: config.remote.depth,
                content_types: config.remote.content_types.clone(),
                timeout_secs: config.remote.timeout_secs,
            },
            payment: SanitizedPaymentConfig {
                mode: config.payment.mode,
                live_key_configured: config.payment.secret_key(PaymentMode::Live).is_some(),
                test_key_configured: config.payment.secret_key(PaymentMode::Test).is_some(),
                currency: config.payment.currency.clone(),
                statement_descriptor: config.payment.statement_descriptor.clone(),
                timeout_secs: config.payment.timeout_secs,
            },
            pricing: config.pricing.clone(),
            retention: config.retention.clone(),
            store: config.store.clone(),
            notifications: SanitizedNotificationConfig {
                admin_email: config.notifications.admin_email.clone(),
                smtp_configured: config.notifications.smtp.is_some(),
            },
        }
    }
}
