//! Stripe payment processor implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::PaymentConfig;

use super::{CheckoutSession, PaymentClient, PaymentError, PaymentMode, SessionStatus};

/// Placeholder Stripe substitutes with the real session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Stripe REST client. Form-encoded requests, bearer auth with the secret key
/// of the requested mode.
pub struct StripeClient {
    client: Client,
    config: PaymentConfig,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: PaymentConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    fn authorized(
        &self,
        mode: PaymentMode,
        builder: RequestBuilder,
    ) -> Result<RequestBuilder, PaymentError> {
        let key = self.config.secret_key(mode).ok_or_else(|| {
            PaymentError::NotConfigured(format!("no secret key for {} mode", mode))
        })?;
        Ok(builder.bearer_auth(key))
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        mode: PaymentMode,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{}", self.base_url(), endpoint);
        debug!(%mode, endpoint, "Stripe POST");
        let request = self.authorized(mode, self.client.post(&url).form(params))?;
        let response = request.send().await?;
        Self::parse(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        mode: PaymentMode,
        endpoint: &str,
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{}", self.base_url(), endpoint);
        debug!(%mode, endpoint, "Stripe GET");
        let request = self.authorized(mode, self.client.get(&url))?;
        let response = request.send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

/// Append the session placeholder to the storefront URL.
fn success_url(base: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}session_id={}", base, separator, SESSION_ID_PLACEHOLDER)
}

#[async_trait]
impl PaymentClient for StripeClient {
    async fn create_product(
        &self,
        mode: PaymentMode,
        name: &str,
        description: &str,
        image_urls: &[String],
    ) -> Result<String, PaymentError> {
        let mut params = vec![
            ("name", name.to_string()),
            ("shippable", "false".to_string()),
            (
                "statement_descriptor",
                self.config.statement_descriptor.clone(),
            ),
        ];
        // Stripe rejects an empty description
        if !description.is_empty() {
            params.push(("description", description.to_string()));
        }
        for url in image_urls {
            params.push(("images[]", url.clone()));
        }

        let product: StripeObject = self.post_form(mode, "products", &params).await?;
        Ok(product.id)
    }

    async fn create_price(
        &self,
        mode: PaymentMode,
        product_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, PaymentError> {
        let params = [
            ("unit_amount", amount_minor.to_string()),
            ("currency", currency.to_string()),
            ("product", product_id.to_string()),
        ];

        let price: StripeObject = self.post_form(mode, "prices", &params).await?;
        Ok(price.id)
    }

    async fn create_checkout_session(
        &self,
        mode: PaymentMode,
        price_id: &str,
        success_url_base: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = [
            ("success_url", success_url(success_url_base)),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("mode", "payment".to_string()),
        ];

        let session: StripeSession = self.post_form(mode, "checkout/sessions", &params).await?;
        let checkout_url = session
            .url
            .ok_or_else(|| PaymentError::Parse("checkout session has no url".to_string()))?;

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }

    async fn get_session(
        &self,
        mode: PaymentMode,
        session_id: &str,
    ) -> Result<SessionStatus, PaymentError> {
        let endpoint = format!(
            "checkout/sessions/{}",
            urlencoding::encode(session_id)
        );
        let session: StripeSession = self.get_json(mode, &endpoint).await?;
        let details = session.customer_details;

        Ok(SessionStatus {
            session_id: session.id,
            payment_status: session.payment_status,
            status: session.status.unwrap_or_default(),
            buyer_name: details.as_ref().and_then(|d| d.name.clone()),
            buyer_email: details.and_then(|d| d.email),
        })
    }
}
