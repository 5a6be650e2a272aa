//! Recording catalog - the local mirror of the remote file host.
//!
//! Rows are keyed by `full_path`. The synchronizer is the only writer of
//! liveness (`verified`, `expired`); the purchase pipeline only attaches
//! payment ids.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalogStore;
pub use types::*;

use chrono::NaiveDate;

use crate::payment::PaymentMode;

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Every row, newest recording first.
    fn list_all(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Rows recorded on `date`, earliest first.
    fn list_by_date(
        &self,
        date: NaiveDate,
        include_expired: bool,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Distinct recording dates of active rows, newest first.
    fn available_dates(&self) -> Result<Vec<NaiveDate>, CatalogError>;

    fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError>;

    fn get_by_path(&self, full_path: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Insert a single row. Fails with `Duplicate` if the path is known.
    fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError>;

    /// Apply a sync pass in one transaction. Returns the ids of rows that
    /// were actually inserted; an insert racing a concurrent pass becomes a
    /// touch.
    fn apply_sync(&self, changes: &SyncChangeSet) -> Result<Vec<i64>, CatalogError>;

    fn set_payment_product(
        &self,
        id: i64,
        mode: PaymentMode,
        product_id: &str,
    ) -> Result<(), CatalogError>;

    fn set_payment_price(
        &self,
        id: i64,
        mode: PaymentMode,
        price_id: &str,
    ) -> Result<(), CatalogError>;

    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
