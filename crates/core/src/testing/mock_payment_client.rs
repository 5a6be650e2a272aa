//! Mock payment processor for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::payment::{CheckoutSession, PaymentClient, PaymentError, PaymentMode, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProduct {
    pub mode: PaymentMode,
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrice {
    pub mode: PaymentMode,
    pub price_id: String,
    pub product_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSession {
    pub mode: PaymentMode,
    pub session_id: String,
    pub price_id: String,
    pub success_url: String,
}

/// Mock implementation of the PaymentClient trait.
///
/// New sessions start `unpaid`/`open`; tests flip them with
/// [`MockPaymentClient::mark_paid`].
#[derive(Debug, Default)]
pub struct MockPaymentClient {
    products: Arc<RwLock<Vec<RecordedProduct>>>,
    prices: Arc<RwLock<Vec<RecordedPrice>>>,
    sessions: Arc<RwLock<Vec<RecordedSession>>>,
    statuses: Arc<RwLock<HashMap<String, SessionStatus>>>,
    get_session_calls: Arc<RwLock<u32>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<PaymentError>>>,
}

impl MockPaymentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_next_error(&self, error: PaymentError) {
        *self.next_error.write().await = Some(error);
    }

    /// Mark a session paid and complete, with buyer details.
    pub async fn mark_paid(&self, session_id: &str, buyer_name: &str, buyer_email: &str) {
        self.set_session_status(SessionStatus {
            session_id: session_id.to_string(),
            payment_status: "paid".to_string(),
            status: "complete".to_string(),
            buyer_name: Some(buyer_name.to_string()),
            buyer_email: Some(buyer_email.to_string()),
        })
        .await;
    }

    pub async fn set_session_status(&self, status: SessionStatus) {
        self.statuses
            .write()
            .await
            .insert(status.session_id.clone(), status);
    }

    pub async fn products(&self) -> Vec<RecordedProduct> {
        self.products.read().await.clone()
    }

    pub async fn prices(&self) -> Vec<RecordedPrice> {
        self.prices.read().await.clone()
    }

    pub async fn sessions(&self) -> Vec<RecordedSession> {
        self.sessions.read().await.clone()
    }

    pub async fn get_session_calls(&self) -> u32 {
        *self.get_session_calls.read().await
    }

    async fn take_error(&self) -> Option<PaymentError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl PaymentClient for MockPaymentClient {
    async fn create_product(
        &self,
        mode: PaymentMode,
        name: &str,
        description: &str,
        image_urls: &[String],
    ) -> Result<String, PaymentError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut products = self.products.write().await;
        let product_id = format!("prod_{}_{}", mode, products.len() + 1);
        products.push(RecordedProduct {
            mode,
            product_id: product_id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            image_urls: image_urls.to_vec(),
        });
        Ok(product_id)
    }

    async fn create_price(
        &self,
        mode: PaymentMode,
        product_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, PaymentError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut prices = self.prices.write().await;
        let price_id = format!("price_{}_{}", mode, prices.len() + 1);
        prices.push(RecordedPrice {
            mode,
            price_id: price_id.clone(),
            product_id: product_id.to_string(),
            amount_minor,
            currency: currency.to_string(),
        });
        Ok(price_id)
    }

    async fn create_checkout_session(
        &self,
        mode: PaymentMode,
        price_id: &str,
        success_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut sessions = self.sessions.write().await;
        let session_id = format!("cs_{}_{}", mode, sessions.len() + 1);
        sessions.push(RecordedSession {
            mode,
            session_id: session_id.clone(),
            price_id: price_id.to_string(),
            success_url: success_url.to_string(),
        });
        drop(sessions);

        self.set_session_status(SessionStatus {
            session_id: session_id.clone(),
            payment_status: "unpaid".to_string(),
            status: "open".to_string(),
            buyer_name: None,
            buyer_email: None,
        })
        .await;

        Ok(CheckoutSession {
            checkout_url: format!("https://checkout.example.com/pay/{}", session_id),
            session_id,
        })
    }

    async fn get_session(
        &self,
        mode: PaymentMode,
        session_id: &str,
    ) -> Result<SessionStatus, PaymentError> {
        *self.get_session_calls.write().await += 1;
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let known_in_mode = self
            .sessions
            .read()
            .await
            .iter()
            .any(|s| s.session_id == session_id && s.mode == mode);
        if !known_in_mode {
            return Err(PaymentError::Api {
                status: 404,
                message: format!("No such checkout.session: {}", session_id),
            });
        }

        self.statuses
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                status: 404,
                message: format!("No such checkout.session: {}", session_id),
            })
    }
}
