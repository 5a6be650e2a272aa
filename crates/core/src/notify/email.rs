//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::{NotificationConfig, SmtpConfig};

use super::{render_template, Notification, Notifier, NotifyError};

/// Sends notifications as plain-text email.
pub struct EmailNotifier {
    config: NotificationConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("admin_email", &self.config.admin_email)
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl EmailNotifier {
    pub fn new(config: NotificationConfig) -> Result<Self, NotifyError> {
        let smtp = config
            .smtp
            .as_ref()
            .ok_or_else(|| NotifyError::Configuration("smtp section missing".to_string()))?;
        let transport = build_transport(smtp)?;
        Ok(Self { config, transport })
    }

    /// Resolve the recipient for a notification.
    fn recipient(&self, notification: &Notification) -> Result<String, NotifyError> {
        let address = if notification.kind.is_for_buyer() {
            notification.variable("buyer_email").map(str::to_string)
        } else {
            self.config.admin_email.clone()
        };

        address
            .filter(|a| !a.is_empty())
            .ok_or_else(|| NotifyError::MissingRecipient(notification.kind.to_string()))
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let template = notification.kind.template(&self.config.templates);
        let subject = render_template(&template.subject, &notification.variables);
        let body = render_template(&template.body, &notification.variables);

        let from = self
            .config
            .from
            .as_deref()
            .or(self.config.admin_email.as_deref())
            .ok_or_else(|| NotifyError::Configuration("no sender address".to_string()))?;
        let from: Mailbox = from
            .parse()
            .map_err(|e| NotifyError::Configuration(format!("invalid from address: {e}")))?;
        let to: Mailbox = self
            .recipient(notification)?
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("invalid recipient address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(|e| NotifyError::Delivery(format!("failed to build email: {e}")))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!(kind = %notification.kind, "Building notification email");
        let message = self.build_message(notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        info!(kind = %notification.kind, "Notification email sent");
        Ok(())
    }
}

fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let builder = if config.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Configuration(format!("SMTP TLS relay error: {e}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };

    let builder = builder.port(config.port);

    let builder = if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder.credentials(Credentials::new(user.clone(), pass.clone()))
    } else {
        builder
    };

    Ok(builder.build())
}
