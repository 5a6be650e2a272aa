use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{MessageTemplate, NotificationTemplates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A recording showed up on the file host.
    NewRecordingAdmin,
    /// Sent to the buyer with the download link.
    PurchaseConfirmationBuyer,
    /// Sent to the admin when a sale completes.
    PurchaseConfirmationAdmin,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewRecordingAdmin => "new_recording_admin",
            Self::PurchaseConfirmationBuyer => "purchase_confirmation_buyer",
            Self::PurchaseConfirmationAdmin => "purchase_confirmation_admin",
        }
    }

    /// Whether this kind goes to the buyer rather than the admin.
    pub fn is_for_buyer(&self) -> bool {
        matches!(self, Self::PurchaseConfirmationBuyer)
    }

    pub fn template<'a>(&self, templates: &'a NotificationTemplates) -> &'a MessageTemplate {
        match self {
            Self::NewRecordingAdmin => &templates.new_recording_admin,
            Self::PurchaseConfirmationBuyer => &templates.purchase_confirmation_buyer,
            Self::PurchaseConfirmationAdmin => &templates.purchase_confirmation_admin,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification and the values for its template placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub variables: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            variables: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

/// Replace every `{{name}}` with its variable. Unknown placeholders are left
/// in place.
pub fn render_template(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (name, value) in variables {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let notification = Notification::new(NotificationKind::PurchaseConfirmationBuyer)
            .with("buyer_name", "Ada")
            .with("share_link", "https://cloud.example.com/s/x");

        let rendered = render_template(
            "Dear {{buyer_name}}, get it at {{share_link}} before {{share_expiry}}",
            &notification.variables,
        );
        assert_eq!(
            rendered,
            "Dear Ada, get it at https://cloud.example.com/s/x before {{share_expiry}}"
        );
    }

    #[test]
    fn test_kind_selects_template() {
        let templates = NotificationTemplates::default();
        let template = NotificationKind::PurchaseConfirmationAdmin.template(&templates);
        assert!(template.subject.contains("{{file_name}}"));
        assert!(NotificationKind::PurchaseConfirmationBuyer.is_for_buyer());
        assert!(!NotificationKind::NewRecordingAdmin.is_for_buyer());
    }
}
