//! SQLite-backed catalog implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CatalogEntry, CatalogError, CatalogStats, CatalogStore, NewCatalogEntry, PaymentIds,
    SyncChangeSet,
};
use crate::db;
use crate::payment::PaymentMode;

const COLUMNS: &str = "id, full_path, file_name, folder, size, size_bytes, content_type, \
     description, start_date, start_time, end_time, thumbnail_path, thumbnail_url, \
     test_product_id, test_price_id, live_product_id, live_price_id, verified, expired";

const INSERT: &str = "INSERT INTO catalog_entries (
        full_path, file_name, folder, size, size_bytes, content_type, description,
        start_date, start_time, end_time, thumbnail_path, thumbnail_url, verified
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(full_path) DO NOTHING";

/// SQLite-backed catalog store.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Open the database file, creating tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = db::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_path TEXT NOT NULL UNIQUE,
                file_name TEXT NOT NULL,
                folder TEXT NOT NULL,
                size TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                content_type TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                start_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                thumbnail_path TEXT NOT NULL,
                thumbnail_url TEXT NOT NULL,
                test_product_id TEXT,
                test_price_id TEXT,
                live_product_id TEXT,
                live_price_id TEXT,
                verified TEXT NOT NULL,
                expired TEXT,
                UNIQUE(start_date, full_path)
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_start_date ON catalog_entries(start_date);
            CREATE INDEX IF NOT EXISTS idx_catalog_expired ON catalog_entries(expired);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        Ok(CatalogEntry {
            id: row.get(0)?,
            full_path: row.get(1)?,
            file_name: row.get(2)?,
            folder: row.get(3)?,
            size: row.get(4)?,
            size_bytes: row.get::<_, i64>(5)?.max(0) as u64,
            content_type: row.get(6)?,
            description: row.get(7)?,
            start_date: db::get_date(row, 8)?,
            start_time: db::get_time(row, 9)?,
            end_time: db::get_time(row, 10)?,
            thumbnail_path: row.get(11)?,
            thumbnail_url: row.get(12)?,
            test_payment: PaymentIds {
                product_id: row.get(13)?,
                price_id: row.get(14)?,
            },
            live_payment: PaymentIds {
                product_id: row.get(15)?,
                price_id: row.get(16)?,
            },
            verified: db::get_timestamp(row, 17)?,
            expired: db::get_optional_timestamp(row, 18)?,
        })
    }

    fn query_entries(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, Self::row_to_entry)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(entries)
    }

    fn insert_row(conn: &Connection, entry: &NewCatalogEntry) -> rusqlite::Result<usize> {
        conn.execute(
            INSERT,
            params![
                entry.full_path,
                entry.file_name,
                entry.folder,
                entry.size,
                entry.size_bytes as i64,
                entry.content_type,
                entry.description,
                db::date_to_sql(entry.start_date),
                db::time_to_sql(entry.start_time),
                db::time_to_sql(entry.end_time),
                entry.thumbnail_path,
                entry.thumbnail_url,
                entry.verified.to_rfc3339(),
            ],
        )
    }

    fn update_column(&self, id: i64, column: &str, value: &str) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                &format!("UPDATE catalog_entries SET {} = ?1 WHERE id = ?2", column),
                params![value, id],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn list_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        Self::query_entries(
            &conn,
            &format!(
                "SELECT {} FROM catalog_entries ORDER BY start_date DESC, start_time DESC, id DESC",
                COLUMNS
            ),
            &[],
        )
    }

    fn list_by_date(
        &self,
        date: NaiveDate,
        include_expired: bool,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let expired_clause = if include_expired {
            ""
        } else {
            " AND expired IS NULL"
        };
        Self::query_entries(
            &conn,
            &format!(
                "SELECT {} FROM catalog_entries WHERE start_date = ?1{} ORDER BY start_time, id",
                COLUMNS, expired_clause
            ),
            &[&db::date_to_sql(date)],
        )
    }

    fn available_dates(&self) -> Result<Vec<NaiveDate>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT start_date FROM catalog_entries
                 WHERE expired IS NULL ORDER BY start_date DESC",
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| db::get_date(row, 0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(dates)
    }

    fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM catalog_entries WHERE id = ?1", COLUMNS),
            params![id],
            Self::row_to_entry,
        )
        .optional()
        .map_err(|e| CatalogError::Database(e.to_string()))?
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    fn get_by_path(&self, full_path: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM catalog_entries WHERE full_path = ?1", COLUMNS),
            params![full_path],
            Self::row_to_entry,
        )
        .optional()
        .map_err(|e| CatalogError::Database(e.to_string()))
    }

    fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError> {
        let id = {
            let conn = self.conn.lock().unwrap();
            let inserted = Self::insert_row(&conn, &entry)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            if inserted == 0 {
                return Err(CatalogError::Duplicate(entry.full_path));
            }
            conn.last_insert_rowid()
        };
        self.get(id)
    }

    fn apply_sync(&self, changes: &SyncChangeSet) -> Result<Vec<i64>, CatalogError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let verified = changes.verified.to_rfc3339();
        let mut inserted_ids = Vec::new();

        for entry in &changes.inserts {
            let inserted = Self::insert_row(&tx, entry)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            if inserted == 1 {
                inserted_ids.push(tx.last_insert_rowid());
            } else {
                tx.execute(
                    "UPDATE catalog_entries SET verified = ?1, expired = NULL WHERE full_path = ?2",
                    params![verified, entry.full_path],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            }
        }

        for path in &changes.touches {
            tx.execute(
                "UPDATE catalog_entries SET verified = ?1, expired = NULL WHERE full_path = ?2",
                params![verified, path],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        for path in &changes.expirations {
            tx.execute(
                "UPDATE catalog_entries SET expired = ?1 WHERE full_path = ?2 AND expired IS NULL",
                params![verified, path],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        for id in &changes.purges {
            tx.execute("DELETE FROM catalog_entries WHERE id = ?1", params![id])
                .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(inserted_ids)
    }

    fn set_payment_product(
        &self,
        id: i64,
        mode: PaymentMode,
        product_id: &str,
    ) -> Result<(), CatalogError> {
        self.update_column(id, &format!("{}_product_id", mode.as_str()), product_id)
    }

    fn set_payment_price(
        &self,
        id: i64,
        mode: PaymentMode,
        price_id: &str,
    ) -> Result<(), CatalogError> {
        self.update_column(id, &format!("{}_price_id", mode.as_str()), price_id)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN expired IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN expired IS NULL THEN size_bytes ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN test_product_id IS NOT NULL
                    OR live_product_id IS NOT NULL THEN 1 ELSE 0 END), 0),
                MIN(start_date),
                MAX(start_date)
             FROM catalog_entries",
            [],
            |row| {
                let total: i64 = row.get(0)?;
                let active: i64 = row.get(1)?;
                let active_size: i64 = row.get(2)?;
                let with_product: i64 = row.get(3)?;
                Ok(CatalogStats {
                    total_entries: total as u64,
                    active_entries: active as u64,
                    expired_entries: (total - active) as u64,
                    active_size_bytes: active_size as u64,
                    with_payment_product: with_product as u64,
                    oldest_recording: db::get_optional_date(row, 4)?,
                    newest_recording: db::get_optional_date(row, 5)?,
                })
            },
        )
        .map_err(|e| CatalogError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingName;
    use crate::remote::RemoteFile;
    use chrono::{Duration, NaiveTime, Utc};

    fn create_test_store() -> SqliteCatalogStore {
        SqliteCatalogStore::in_memory().unwrap()
    }

    fn expired_paths(store: &SqliteCatalogStore) -> Vec<String> {
        store
            .list_all()
            .unwrap()
            .into_iter()
            .filter(|e| e.expired.is_some())
            .map(|e| e.full_path)
            .collect()
    }

    fn new_entry(path: &str) -> NewCatalogEntry {
        let file = RemoteFile {
            path: path.to_string(),
            content_type: "video/mp4".to_string(),
            size_bytes: 1024,
            is_directory: false,
        };
        let file_name = path.rsplit('/').next().unwrap();
        let name = RecordingName::parse(file_name).unwrap();
        NewCatalogEntry::from_remote(&file, &name, "http://localhost/thumbs", Utc::now())
    }

    #[test]
    fn test_insert_and_get() {
        let store = create_test_store();
        let entry = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();

        let fetched = store.get(entry.id).unwrap();
        assert_eq!(fetched.full_path, "/2024/2024-03-01_20-00_22-30.mp4");
        assert_eq!(fetched.start_time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(fetched.end_time, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(fetched.test_payment, PaymentIds::default());
        assert!(!fetched.is_expired());
    }

    #[test]
    fn test_insert_duplicate_path() {
        let store = create_test_store();
        store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();
        let result = store.insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"));
        assert!(matches!(result, Err(CatalogError::Duplicate(_))));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(matches!(store.get(42), Err(CatalogError::NotFound(_))));
        assert!(store.get_by_path("/nope.mp4").unwrap().is_none());
    }

    #[test]
    fn test_apply_sync_inserts_touches_expires_purges() {
        let store = create_test_store();
        let keep = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();
        let gone = store
            .insert(new_entry("/2024/2024-03-02_20-00_22-30.mp4"))
            .unwrap();
        let purge = store
            .insert(new_entry("/2024/2024-03-03_20-00_22-30.mp4"))
            .unwrap();

        let pass = Utc::now() + Duration::minutes(5);
        let mut changes = SyncChangeSet::new(pass);
        changes.inserts.push(new_entry("/2024/2024-03-04_20-00_22-30.mp4"));
        changes.touches.push(keep.full_path.clone());
        changes.expirations.push(gone.full_path.clone());
        changes.purges.push(purge.id);

        let inserted = store.apply_sync(&changes).unwrap();
        assert_eq!(inserted.len(), 1);

        assert_eq!(store.get(keep.id).unwrap().verified, pass);
        assert!(store.get(gone.id).unwrap().is_expired());
        assert!(matches!(store.get(purge.id), Err(CatalogError::NotFound(_))));
        assert_eq!(
            store.get(inserted[0]).unwrap().full_path,
            "/2024/2024-03-04_20-00_22-30.mp4"
        );
    }

    #[test]
    fn test_apply_sync_conflicting_insert_becomes_touch() {
        let store = create_test_store();
        let existing = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();

        let pass = Utc::now() + Duration::minutes(5);
        let mut changes = SyncChangeSet::new(pass);
        changes.inserts.push(new_entry("/2024/2024-03-01_20-00_22-30.mp4"));

        let inserted = store.apply_sync(&changes).unwrap();
        assert!(inserted.is_empty());
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(store.get(existing.id).unwrap().verified, pass);
    }

    #[test]
    fn test_touch_revives_expired_row() {
        let store = create_test_store();
        let entry = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();

        let mut expire = SyncChangeSet::new(Utc::now());
        expire.expirations.push(entry.full_path.clone());
        store.apply_sync(&expire).unwrap();
        assert_eq!(expired_paths(&store), vec![entry.full_path.clone()]);

        let mut touch = SyncChangeSet::new(Utc::now());
        touch.touches.push(entry.full_path.clone());
        store.apply_sync(&touch).unwrap();
        assert!(expired_paths(&store).is_empty());
    }

    #[test]
    fn test_expiration_keeps_first_timestamp() {
        let store = create_test_store();
        let entry = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();

        let first = Utc::now();
        let mut changes = SyncChangeSet::new(first);
        changes.expirations.push(entry.full_path.clone());
        store.apply_sync(&changes).unwrap();

        let mut changes = SyncChangeSet::new(first + Duration::hours(1));
        changes.expirations.push(entry.full_path.clone());
        store.apply_sync(&changes).unwrap();

        assert_eq!(store.get(entry.id).unwrap().expired, Some(first));
    }

    #[test]
    fn test_list_by_date_and_available_dates() {
        let store = create_test_store();
        store
            .insert(new_entry("/2024/2024-03-01_22-00_23-30.mp4"))
            .unwrap();
        store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();
        let other = store
            .insert(new_entry("/2024/2024-03-02_20-00_22-30.mp4"))
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let entries = store.list_by_date(date, false).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_name, "2024-03-01_20-00_22-30.mp4");

        let mut changes = SyncChangeSet::new(Utc::now());
        changes.expirations.push(other.full_path.clone());
        store.apply_sync(&changes).unwrap();

        assert_eq!(store.available_dates().unwrap(), vec![date]);
        let march_2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(store.list_by_date(march_2, false).unwrap().is_empty());
        assert_eq!(store.list_by_date(march_2, true).unwrap().len(), 1);
    }

    #[test]
    fn test_payment_ids() {
        let store = create_test_store();
        let entry = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();

        store
            .set_payment_product(entry.id, PaymentMode::Test, "prod_1")
            .unwrap();
        store
            .set_payment_price(entry.id, PaymentMode::Test, "price_1")
            .unwrap();

        let fetched = store.get(entry.id).unwrap();
        assert_eq!(fetched.test_payment.product_id.as_deref(), Some("prod_1"));
        assert_eq!(fetched.test_payment.price_id.as_deref(), Some("price_1"));
        assert_eq!(fetched.payment_ids(PaymentMode::Live), &PaymentIds::default());

        store
            .set_payment_product(entry.id, PaymentMode::Live, "prod_live_1")
            .unwrap();
        let fetched = store.get(entry.id).unwrap();
        assert_eq!(
            fetched.payment_ids(PaymentMode::Live).product_id.as_deref(),
            Some("prod_live_1")
        );
        assert_eq!(fetched.live_payment.price_id, None);
        assert_eq!(fetched.test_payment.product_id.as_deref(), Some("prod_1"));

        assert!(matches!(
            store.set_payment_product(999, PaymentMode::Test, "prod_2"),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_stats() {
        let store = create_test_store();
        let a = store
            .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
            .unwrap();
        store
            .insert(new_entry("/2024/2024-03-05_20-00_22-30.mp4"))
            .unwrap();
        store
            .set_payment_product(a.id, PaymentMode::Live, "prod_1")
            .unwrap();

        let mut changes = SyncChangeSet::new(Utc::now());
        changes.expirations.push(a.full_path.clone());
        store.apply_sync(&changes).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.active_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.active_size_bytes, 1024);
        assert_eq!(stats.with_payment_product, 1);
        assert_eq!(stats.oldest_recording, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.newest_recording, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_empty_stats() {
        let store = create_test_store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.oldest_recording, None);
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let store = SqliteCatalogStore::new(&path).unwrap();
            store
                .insert(new_entry("/2024/2024-03-01_20-00_22-30.mp4"))
                .unwrap();
        }
        let store = SqliteCatalogStore::new(&path).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
