//! Payment processor abstraction.
//!
//! The core talks to the processor only through [`PaymentClient`]. Every call
//! is scoped by [`PaymentMode`] so test and live credentials never mix.

mod stripe;
mod types;

pub use stripe::StripeClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by payment processor clients.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request never got a response.
    #[error("Payment processor unreachable: {0}")]
    Transport(String),

    #[error("Payment processor request timed out")]
    Timeout,

    /// The processor rejected the request.
    #[error("Payment processor error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse payment processor response: {0}")]
    Parse(String),

    /// No credentials for the requested mode.
    #[error("Payment processor not configured: {0}")]
    NotConfigured(String),
}

impl PaymentError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PaymentError::Timeout
        } else if e.is_decode() {
            PaymentError::Parse(e.to_string())
        } else {
            PaymentError::Transport(e.to_string())
        }
    }
}

/// Capability interface of the payment processor.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Create a product and return its id.
    async fn create_product(
        &self,
        mode: PaymentMode,
        name: &str,
        description: &str,
        image_urls: &[String],
    ) -> Result<String, PaymentError>;

    /// Create a one-off price for a product and return its id.
    async fn create_price(
        &self,
        mode: PaymentMode,
        product_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, PaymentError>;

    /// Create a single-use hosted checkout session.
    async fn create_checkout_session(
        &self,
        mode: PaymentMode,
        price_id: &str,
        success_url: &str,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetch the current state of a checkout session.
    async fn get_session(
        &self,
        mode: PaymentMode,
        session_id: &str,
    ) -> Result<SessionStatus, PaymentError>;
}
