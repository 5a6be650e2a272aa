use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::Config;
use crate::payment::{PaymentError, PaymentMode};
use crate::remote::RemoteError;
use crate::sales::{Sale, SalesError};

/// Where to send the buyer to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub sale_id: i64,
    pub session_id: String,
    pub checkout_url: String,
}

/// Outcome of confirming a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SaleResult {
    Paid {
        sale_id: i64,
        /// `None` only for a duplicate whose link has since been cleaned up.
        share_link: Option<String>,
        share_expiry: Option<NaiveDate>,
        /// The sale had already been confirmed; nothing was provisioned.
        duplicate: bool,
    },
    /// The processor does not report the session as paid and complete.
    NotPaid {
        sale_id: i64,
        payment_status: String,
    },
}

impl SaleResult {
    /// The stored result of an already confirmed sale.
    pub(crate) fn duplicate_of(sale: &Sale) -> Self {
        SaleResult::Paid {
            sale_id: sale.id,
            share_link: sale.share_link.clone(),
            share_expiry: sale.share_expiry,
            duplicate: true,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, SaleResult::Paid { .. })
    }
}

/// A share link issued for a confirmed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    pub sale_id: i64,
    pub share_link: String,
    pub share_expiry: NaiveDate,
}

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sale {0} has not been paid")]
    NotConfirmed(i64),

    #[error("Payment processor error: {0}")]
    PaymentProcessor(#[from] PaymentError),

    /// The file host failed; the sale stays pending and can be retried.
    #[error("File host error: {0}")]
    Transport(#[from] RemoteError),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    #[error("Sales error: {0}")]
    Sales(SalesError),
}

impl From<CatalogError> for PurchaseError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(what) => PurchaseError::NotFound(what),
            other => PurchaseError::Catalog(other),
        }
    }
}

impl From<SalesError> for PurchaseError {
    fn from(e: SalesError) -> Self {
        match e {
            SalesError::NotFound(what) => PurchaseError::NotFound(what),
            other => PurchaseError::Sales(other),
        }
    }
}

/// Settings a purchase pipeline needs, taken from the loaded config.
#[derive(Debug, Clone)]
pub struct PurchaseSettings {
    /// Mode new checkout sessions are created in.
    pub mode: PaymentMode,
    pub currency: String,
    /// Where the processor sends the buyer back to.
    pub storefront_url: String,
    pub root_folder: String,
    pub payment_timeout: Duration,
    pub remote_timeout: Duration,
}

impl PurchaseSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.payment.mode,
            currency: config.payment.currency.clone(),
            storefront_url: config.store.storefront_url.clone(),
            root_folder: config.remote.root_folder.clone(),
            payment_timeout: Duration::from_secs(config.payment.timeout_secs as u64),
            remote_timeout: Duration::from_secs(config.remote.timeout_secs as u64),
        }
    }
}
