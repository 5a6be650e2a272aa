//! Types shared by payment processor clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processor environment. Each mode has its own credentials and its own
/// products, prices and sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Test,
    Live,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Test => "test",
            PaymentMode::Live => "live",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(PaymentMode::Test),
            "live" => Ok(PaymentMode::Live),
            other => Err(format!("unknown payment mode: {}", other)),
        }
    }
}

/// A freshly created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Hosted page the buyer is redirected to.
    pub checkout_url: String,
}

/// Processor-side state of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    /// e.g. "paid", "unpaid"
    pub payment_status: String,
    /// e.g. "complete", "open", "expired"
    pub status: String,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_email: Option<String>,
}

impl SessionStatus {
    /// Only a paid and completed session unlocks a download.
    pub fn is_paid_and_complete(&self) -> bool {
        self.payment_status == "paid" && self.status == "complete"
    }
}
