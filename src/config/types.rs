use serde::Deserialize;

/// Main configuration structure for RIA Cars
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration pointing at the production site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
}

/// Target site endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Paginated listing page; `?page=N` is appended per page
    pub listing_url: String,

    /// Base URL detail links are resolved against
    pub base_url: String,

    /// Phone-reveal endpoint receiving the POST payload
    pub phone_url: String,

    /// Path fragment that marks a link as a vehicle detail page
    pub detail_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://auto.ria.com/uk/car/used/".to_string(),
            base_url: "https://auto.ria.com".to_string(),
            phone_url: "https://auto.ria.com/bff/final-page/public/auto/popUp/".to_string(),
            detail_marker: "/auto_".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of worker tasks draining the detail-page queue
    pub max_workers: u32,

    /// Maximum number of simultaneous outbound requests across the whole crawl
    pub max_concurrent_requests: u32,

    /// Consecutive listing pages without links before pagination stops
    pub max_empty_pages: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_concurrent_requests: 5,
            max_empty_pages: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Database and backup configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory snapshot files are written to
    pub dump_dir: String,

    /// External program invoked to produce a snapshot
    pub dump_utility: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./ria_cars.db".to_string(),
            dump_dir: "dumps".to_string(),
            dump_utility: "sqlite3".to_string(),
        }
    }
}

/// HTTP trigger surface configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Daily trigger times (UTC) for the periodic crawl and dump
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub crawl_hour: u32,
    pub crawl_minute: u32,
    pub dump_hour: u32,
    pub dump_minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            crawl_hour: 12,
            crawl_minute: 0,
            dump_hour: 2,
            dump_minute: 0,
        }
    }
}
