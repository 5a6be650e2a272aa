//! Mock notifier for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::notify::{Notification, NotificationKind, Notifier, NotifyError};

/// Records every notification it is handed.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
    /// If set, the next notification will fail with this error.
    next_error: Arc<RwLock<Option<NotifyError>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    pub async fn sent_of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn set_next_error(&self, error: NotifyError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.sent.write().await.push(notification.clone());
        Ok(())
    }
}
