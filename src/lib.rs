//! RIA Cars: a used-car listings harvester
//!
//! This crate walks the paginated listing pages of a classifieds site, visits
//! every vehicle detail page with a bounded worker pool, extracts a structured
//! record from each (including a secondary phone-reveal call) and upserts the
//! records into SQLite.

pub mod api;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for RIA Cars operations
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP session setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Dump error: {0}")]
    Dump(#[from] storage::DumpError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

/// Result type alias for RIA Cars operations
pub type Result<T> = std::result::Result<T, ScraperError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary};
pub use record::{CarRecord, ValidationError};
pub use storage::{SqliteStorage, Storage};
