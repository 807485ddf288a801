//! Storage traits and error types

use crate::record::CarRecord;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness race on `url`; callers treat it as non-fatal
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What an upsert did, with the row id either way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// A record as read back from storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCar {
    pub id: i64,
    #[serde(flatten)]
    pub record: CarRecord,
    /// RFC 3339 timestamp of the first insert
    pub discovered_at: String,
}

/// Trait for storage backend implementations
pub trait Storage {
    /// Inserts a record or overwrites every non-key field of the row with
    /// the same `url`; `discovered_at` is kept from the first insert
    fn upsert_car(&mut self, record: &CarRecord) -> StorageResult<UpsertOutcome>;

    /// Gets a record by id
    fn get_car(&self, id: i64) -> StorageResult<Option<StoredCar>>;

    /// Gets a page of records ordered by id
    fn list_cars(&self, limit: u32, offset: u32) -> StorageResult<Vec<StoredCar>>;

    /// Counts stored records
    fn count_cars(&self) -> StorageResult<u64>;
}

/// Storage handle shared by crawl workers and API handlers
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;
