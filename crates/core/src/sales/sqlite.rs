//! SQLite-backed sales store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{Finalization, NewSale, Sale, SaleFilter, SaleStatus, SalesError, SalesStore};
use crate::db;
use crate::payment::PaymentMode;

const COLUMNS: &str = "id, catalog_entry_id, payment_session_id, fullname, email, share_link, \
     share_expiry, confirmed_at, mode, price_minor, currency, sales_time";

/// SQLite-backed sales store.
pub struct SqliteSalesStore {
    conn: Mutex<Connection>,
}

impl SqliteSalesStore {
    /// Open the database file, creating tables if needed.
    pub fn new(path: &Path) -> Result<Self, SalesError> {
        let conn = db::open(path).map_err(|e| SalesError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, SalesError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SalesError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SalesError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                catalog_entry_id INTEGER NOT NULL,
                payment_session_id TEXT NOT NULL UNIQUE,
                fullname TEXT,
                email TEXT,
                share_link TEXT,
                share_expiry TEXT,
                confirmed_at TEXT,
                mode TEXT NOT NULL,
                price_minor INTEGER NOT NULL DEFAULT 0,
                currency TEXT NOT NULL,
                sales_time TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sales_catalog_entry ON sales(catalog_entry_id);
            CREATE INDEX IF NOT EXISTS idx_sales_share_expiry ON sales(share_expiry);
            "#,
        )
        .map_err(|e| SalesError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &SaleFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(mode) = filter.mode {
            conditions.push("mode = ?");
            params.push(Box::new(mode.as_str()));
        }

        match filter.status {
            Some(SaleStatus::Pending) => conditions.push("confirmed_at IS NULL"),
            Some(SaleStatus::Confirmed) => conditions.push("confirmed_at IS NOT NULL"),
            None => {}
        }

        if let Some(id) = filter.catalog_entry_id {
            conditions.push("catalog_entry_id = ?");
            params.push(Box::new(id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_sale(row: &rusqlite::Row) -> rusqlite::Result<Sale> {
        let mode_str: String = row.get(8)?;
        let mode: PaymentMode = mode_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(8, Type::Text, e.into())
        })?;

        Ok(Sale {
            id: row.get(0)?,
            catalog_entry_id: row.get(1)?,
            payment_session_id: row.get(2)?,
            fullname: row.get(3)?,
            email: row.get(4)?,
            share_link: row.get(5)?,
            share_expiry: db::get_optional_date(row, 6)?,
            confirmed_at: db::get_optional_timestamp(row, 7)?,
            mode,
            price_minor: row.get(9)?,
            currency: row.get(10)?,
            sales_time: db::get_timestamp(row, 11)?,
        })
    }

    fn query_one(
        conn: &Connection,
        condition: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<Sale>, SalesError> {
        conn.query_row(
            &format!("SELECT {} FROM sales WHERE {}", COLUMNS, condition),
            [param],
            Self::row_to_sale,
        )
        .optional()
        .map_err(|e| SalesError::Database(e.to_string()))
    }
}

impl SalesStore for SqliteSalesStore {
    fn create(&self, sale: NewSale) -> Result<Sale, SalesError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO sales (catalog_entry_id, payment_session_id, mode, price_minor, currency, sales_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sale.catalog_entry_id,
                sale.payment_session_id,
                sale.mode.as_str(),
                sale.price_minor,
                sale.currency,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                SalesError::DuplicateSession(sale.payment_session_id.clone())
            }
            other => SalesError::Database(other.to_string()),
        })?;

        let id = conn.last_insert_rowid();
        Self::query_one(&conn, "id = ?1", &id)?.ok_or_else(|| SalesError::NotFound(id.to_string()))
    }

    fn get(&self, id: i64) -> Result<Sale, SalesError> {
        let conn = self.conn.lock().unwrap();
        Self::query_one(&conn, "id = ?1", &id)?.ok_or_else(|| SalesError::NotFound(id.to_string()))
    }

    fn get_by_session(&self, session_id: &str) -> Result<Option<Sale>, SalesError> {
        let conn = self.conn.lock().unwrap();
        Self::query_one(&conn, "payment_session_id = ?1", &session_id)
    }

    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, SalesError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM sales {} ORDER BY sales_time DESC, id DESC",
            COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SalesError::Database(e.to_string()))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_sale)
            .map_err(|e| SalesError::Database(e.to_string()))?;

        let mut sales = Vec::new();
        for row in rows {
            sales.push(row.map_err(|e| SalesError::Database(e.to_string()))?);
        }
        Ok(sales)
    }

    fn finalize(&self, session_id: &str, finalization: &Finalization) -> Result<bool, SalesError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE sales SET fullname = ?1, email = ?2, share_link = ?3, share_expiry = ?4,
                    confirmed_at = ?5
                 WHERE payment_session_id = ?6 AND confirmed_at IS NULL",
                params![
                    finalization.fullname,
                    finalization.email,
                    finalization.share_link,
                    db::date_to_sql(finalization.share_expiry),
                    finalization.confirmed_at.to_rfc3339(),
                    session_id,
                ],
            )
            .map_err(|e| SalesError::Database(e.to_string()))?;

        if updated == 1 {
            return Ok(true);
        }

        // Distinguish "already confirmed" from "unknown session"
        match Self::query_one(&conn, "payment_session_id = ?1", &session_id)? {
            Some(_) => Ok(false),
            None => Err(SalesError::NotFound(session_id.to_string())),
        }
    }

    fn update_share(
        &self,
        id: i64,
        share_link: &str,
        share_expiry: NaiveDate,
    ) -> Result<(), SalesError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE sales SET share_link = ?1, share_expiry = ?2 WHERE id = ?3",
                params![share_link, db::date_to_sql(share_expiry), id],
            )
            .map_err(|e| SalesError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(SalesError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn has_active_share(&self, catalog_entry_id: i64, today: NaiveDate) -> Result<bool, SalesError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sales
                 WHERE catalog_entry_id = ?1 AND share_link IS NOT NULL AND share_expiry >= ?2",
                params![catalog_entry_id, db::date_to_sql(today)],
                |row| row.get(0),
            )
            .map_err(|e| SalesError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    fn count_for_entry(&self, catalog_entry_id: i64) -> Result<u64, SalesError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sales WHERE catalog_entry_id = ?1",
                params![catalog_entry_id],
                |row| row.get(0),
            )
            .map_err(|e| SalesError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    fn clear_expired_shares(&self, today: NaiveDate) -> Result<u64, SalesError> {
        let conn = self.conn.lock().unwrap();
        let cleared = conn
            .execute(
                "UPDATE sales SET share_link = NULL
                 WHERE share_link IS NOT NULL AND share_expiry < ?1",
                params![db::date_to_sql(today)],
            )
            .map_err(|e| SalesError::Database(e.to_string()))?;
        Ok(cleared as u64)
    }
}
