//! Templated notifications.
//!
//! Call sites treat delivery as fire-and-forget through [`notify_quietly`]:
//! a failed notification is logged and never fails the operation that
//! triggered it.

mod email;
mod types;

pub use email::EmailNotifier;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NotificationConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier misconfigured: {0}")]
    Configuration(String),

    /// No address to send this kind of notification to.
    #[error("No recipient for {0} notification")]
    MissingRecipient(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Sink for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log. Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            kind = %notification.kind,
            variables = ?notification.variables,
            "Notification (log only)"
        );
        Ok(())
    }
}

/// Deliver a notification, logging instead of propagating failures.
pub async fn notify_quietly(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(&notification).await {
        warn!(kind = %notification.kind, error = %e, "Notification not delivered");
    }
}

/// Create the notifier for the given configuration.
pub fn create_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.smtp {
        Some(_) => Ok(Arc::new(EmailNotifier::new(config.clone())?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
