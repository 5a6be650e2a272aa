use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payment::PaymentMode;

/// A purchase attempt or completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub catalog_entry_id: i64,
    pub payment_session_id: String,
    /// Buyer name as reported by the payment processor.
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub share_link: Option<String>,
    pub share_expiry: Option<NaiveDate>,
    /// When the payment was confirmed. `None` while pending.
    pub confirmed_at: Option<DateTime<Utc>>,
    pub mode: PaymentMode,
    /// Amount charged, minor currency units.
    pub price_minor: i64,
    pub currency: String,
    pub sales_time: DateTime<Utc>,
}

impl Sale {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    pub fn status(&self) -> SaleStatus {
        if self.is_confirmed() {
            SaleStatus::Confirmed
        } else {
            SaleStatus::Pending
        }
    }
}

/// A sale about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub catalog_entry_id: i64,
    pub payment_session_id: String,
    pub mode: PaymentMode,
    pub price_minor: i64,
    pub currency: String,
}

/// Data written when a sale is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub share_link: String,
    pub share_expiry: NaiveDate,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleStatus::Pending => write!(f, "pending"),
            SaleStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

impl FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SaleStatus::Pending),
            "confirmed" => Ok(SaleStatus::Confirmed),
            other => Err(format!("unknown sale status: {}", other)),
        }
    }
}

/// Filter for listing sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub mode: Option<PaymentMode>,
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub catalog_entry_id: Option<i64>,
}

/// Errors for sales operations.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Sale not found: {0}")]
    NotFound(String),

    #[error("Checkout session already recorded: {0}")]
    DuplicateSession(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_strings() {
        assert_eq!("pending".parse::<SaleStatus>().unwrap(), SaleStatus::Pending);
        assert_eq!(SaleStatus::Confirmed.to_string(), "confirmed");
        assert!("paid".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn test_filter_deserializes_from_query_shape() {
        let filter: SaleFilter =
            serde_json::from_str(r#"{"mode": "live", "status": "confirmed"}"#).unwrap();
        assert_eq!(filter.mode, Some(PaymentMode::Live));
        assert_eq!(filter.status, Some(SaleStatus::Confirmed));
        assert_eq!(filter.catalog_entry_id, None);
    }
}
