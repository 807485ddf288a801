//! SQLite storage implementation

use crate::record::CarRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult, StoredCar, UpsertOutcome};
use crate::ScraperError;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const CAR_COLUMNS: &str = "id, url, title, price_usd, odometer, seller_name, phone_number, \
     image_url, image_count, plate_number, vin, discovered_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, ScraperError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ScraperError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Separates uniqueness races from other storage failures
fn classify(err: rusqlite::Error) -> StorageError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StorageError::ConstraintViolation(err.to_string())
    } else {
        StorageError::Sqlite(err)
    }
}

fn car_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCar> {
    Ok(StoredCar {
        id: row.get(0)?,
        record: CarRecord {
            url: row.get(1)?,
            title: row.get(2)?,
            price_usd: row.get(3)?,
            odometer: row.get(4)?,
            seller_name: row.get(5)?,
            phone_number: row.get(6)?,
            image_url: row.get(7)?,
            image_count: row.get(8)?,
            plate_number: row.get(9)?,
            vin: row.get(10)?,
        },
        discovered_at: row.get(11)?,
    })
}

impl Storage for SqliteStorage {
    fn upsert_car(&mut self, record: &CarRecord) -> StorageResult<UpsertOutcome> {
        let tx = self.conn.transaction().map_err(classify)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM cars WHERE url = ?1",
                params![record.url],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify)?;

        let id: i64 = tx
            .query_row(
                "INSERT INTO cars (url, title, price_usd, odometer, seller_name, phone_number,
                                   image_url, image_count, plate_number, vin, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    price_usd = excluded.price_usd,
                    odometer = excluded.odometer,
                    seller_name = excluded.seller_name,
                    phone_number = excluded.phone_number,
                    image_url = excluded.image_url,
                    image_count = excluded.image_count,
                    plate_number = excluded.plate_number,
                    vin = excluded.vin
                 RETURNING id",
                params![
                    record.url,
                    record.title,
                    record.price_usd,
                    record.odometer,
                    record.seller_name,
                    record.phone_number,
                    record.image_url,
                    record.image_count,
                    record.plate_number,
                    record.vin,
                    Utc::now().to_rfc3339(),
                ],
                |row| row.get(0),
            )
            .map_err(classify)?;

        tx.commit().map_err(classify)?;

        Ok(match existing {
            Some(_) => UpsertOutcome::Updated(id),
            None => UpsertOutcome::Inserted(id),
        })
    }

    fn get_car(&self, id: i64) -> StorageResult<Option<StoredCar>> {
        let sql = format!("SELECT {} FROM cars WHERE id = ?1", CAR_COLUMNS);
        let car = self
            .conn
            .query_row(&sql, params![id], car_from_row)
            .optional()?;
        Ok(car)
    }

    fn list_cars(&self, limit: u32, offset: u32) -> StorageResult<Vec<StoredCar>> {
        let sql = format!(
            "SELECT {} FROM cars ORDER BY id LIMIT ?1 OFFSET ?2",
            CAR_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let cars = stmt
            .query_map(params![limit, offset], car_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cars)
    }

    fn count_cars(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cars", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(url: &str, price: f64) -> CarRecord {
        CarRecord {
            title: Some("Porsche 911".to_string()),
            price_usd: Some(price),
            odometer: Some(150000),
            image_count: Some(2),
            vin: Some("WP0ZZZ99ZTSXXXX24".to_string()),
            ..CarRecord::new(url)
        }
    }

    #[test]
    fn test_insert_then_get() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage.upsert_car(&record("https://a/auto_1.html", 12000.0)).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Inserted(_)));

        let stored = storage.get_car(outcome.id()).unwrap().unwrap();
        assert_eq!(stored.record, record("https://a/auto_1.html", 12000.0));
        assert!(!stored.discovered_at.is_empty());
    }

    #[test]
    fn test_upsert_is_idempotent_and_last_write_wins() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.upsert_car(&record("https://a/auto_1.html", 12000.0)).unwrap();
        let before = storage.get_car(first.id()).unwrap().unwrap();

        let mut changed = record("https://a/auto_1.html", 9500.0);
        changed.vin = None;
        changed.phone_number = Some("+380501234567".to_string());
        let second = storage.upsert_car(&changed).unwrap();

        assert_eq!(second, UpsertOutcome::Updated(first.id()));
        assert_eq!(storage.count_cars().unwrap(), 1);

        let after = storage.get_car(first.id()).unwrap().unwrap();
        assert_eq!(after.record, changed);
        assert_eq!(after.discovered_at, before.discovered_at);
    }

    #[test]
    fn test_get_missing_is_none() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_car(42).unwrap().is_none());
    }

    #[test]
    fn test_list_pages_in_id_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for n in 0..5 {
            storage
                .upsert_car(&record(&format!("https://a/auto_{}.html", n), n as f64))
                .unwrap();
        }

        let page = storage.list_cars(2, 1).unwrap();
        let urls: Vec<&str> = page.iter().map(|c| c.record.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/auto_1.html", "https://a/auto_2.html"]);
        assert!(page[0].id < page[1].id);

        assert!(storage.list_cars(10, 5).unwrap().is_empty());
        assert_eq!(storage.list_cars(100, 0).unwrap().len(), 5);
    }

    #[test]
    fn test_check_failure_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let bad = record("https://a/auto_1.html", -1.0);
        let err = storage.upsert_car(&bad).unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(storage.count_cars().unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cars.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.upsert_car(&record("https://a/auto_1.html", 1.0)).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_cars().unwrap(), 1);
    }
}
