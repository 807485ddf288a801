//! Background jobs: crawl runs and database dumps
//!
//! Both the HTTP trigger endpoints and the daily scheduler go through
//! [`JobRunner`], which keeps at most one crawl running per process.

mod schedule;

pub use schedule::{DailyTrigger, Scheduler};

use crate::config::Config;
use crate::crawler::{Coordinator, CrawlSummary};
use crate::storage::{DumpError, Dumper, SharedStorage};
use crate::ScraperError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clears the running flag when a crawl ends, however it ends
struct CrawlGuard(Arc<AtomicBool>);

impl Drop for CrawlGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Starts crawls and dumps against one shared database
#[derive(Clone)]
pub struct JobRunner {
    config: Arc<Config>,
    storage: SharedStorage,
    dumper: Dumper,
    crawl_running: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(config: Config, storage: SharedStorage) -> Self {
        let dumper = Dumper::from_config(&config.storage);
        Self {
            config: Arc::new(config),
            storage,
            dumper,
            crawl_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a crawl is currently in progress
    pub fn crawl_running(&self) -> bool {
        self.crawl_running.load(Ordering::SeqCst)
    }

    /// Runs one crawl; `Ok(None)` if another crawl is already in progress
    pub async fn run_crawl(&self) -> Result<Option<CrawlSummary>, ScraperError> {
        if self
            .crawl_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("[Jobs] Crawl already in progress, not starting another");
            return Ok(None);
        }
        let _guard = CrawlGuard(self.crawl_running.clone());

        let coordinator = Coordinator::new((*self.config).clone(), self.storage.clone())?;
        coordinator.run().await.map(Some)
    }

    /// Writes a database snapshot and returns its path
    pub async fn run_dump(&self) -> Result<PathBuf, DumpError> {
        self.dumper.dump().await
    }

    /// Starts a crawl in the background
    pub fn spawn_crawl(&self) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            match runner.run_crawl().await {
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => tracing::error!("[Jobs] Crawl failed: {}", e),
            }
        })
    }

    /// Starts a dump in the background
    pub fn spawn_dump(&self) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run_dump().await {
                tracing::error!("[Jobs] Dump failed: {}", e);
            }
        })
    }
}
