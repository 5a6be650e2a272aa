//! Sales - purchase attempts and completed purchases.
//!
//! A sale is created pending when its checkout session is created and is
//! confirmed at most once. Sales are never deleted; share cleanup only clears
//! the link.

mod sqlite;
mod types;

pub use sqlite::SqliteSalesStore;
pub use types::*;

use chrono::NaiveDate;

/// Trait for sales storage.
pub trait SalesStore: Send + Sync {
    /// Record a pending sale. Session ids are unique.
    fn create(&self, sale: NewSale) -> Result<Sale, SalesError>;

    fn get(&self, id: i64) -> Result<Sale, SalesError>;

    fn get_by_session(&self, session_id: &str) -> Result<Option<Sale>, SalesError>;

    /// Sales matching the filter, newest first.
    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, SalesError>;

    /// Confirm a pending sale. Returns `false` without touching the row if
    /// it was already confirmed.
    fn finalize(&self, session_id: &str, finalization: &Finalization) -> Result<bool, SalesError>;

    /// Replace the share link of a sale.
    fn update_share(&self, id: i64, share_link: &str, share_expiry: NaiveDate)
        -> Result<(), SalesError>;

    /// Whether any sale of this entry holds a share link valid on `today`.
    fn has_active_share(&self, catalog_entry_id: i64, today: NaiveDate) -> Result<bool, SalesError>;

    /// Number of sales referencing an entry, pending ones included.
    fn count_for_entry(&self, catalog_entry_id: i64) -> Result<u64, SalesError>;

    /// Clear share links that expired before `today`. Returns how many were
    /// cleared.
    fn clear_expired_shares(&self, today: NaiveDate) -> Result<u64, SalesError>;
}
