//! Storage module for persisting vehicle records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Record upserts keyed on the listing URL
//! - Paged reads for the HTTP API
//! - Snapshots through an external backup utility

mod dump;
mod schema;
mod sqlite;
mod traits;

pub use dump::{DumpError, Dumper};
pub use sqlite::SqliteStorage;
pub use traits::{SharedStorage, Storage, StorageError, StorageResult, StoredCar, UpsertOutcome};

use crate::ScraperError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Opens the database at `path` behind a shared handle
pub fn open_shared(path: &Path) -> Result<SharedStorage, ScraperError> {
    let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new(path)?));
    Ok(storage)
}
