//! Per-run crawl counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the producer and the workers of one run
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_scanned: AtomicU64,
    links_enqueued: AtomicU64,
    items_started: AtomicU64,
    records_saved: AtomicU64,
    records_rejected: AtomicU64,
    fetch_failures: AtomicU64,
    storage_failures: AtomicU64,
}

impl CrawlStats {
    pub fn page_scanned(&self) {
        self.pages_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn links_enqueued(&self, count: usize) {
        self.links_enqueued.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn item_started(&self) {
        self.items_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Enqueued links no worker has picked up yet
    pub fn backlog(&self) -> u64 {
        let enqueued = self.links_enqueued.load(Ordering::Relaxed);
        enqueued.saturating_sub(self.items_started.load(Ordering::Relaxed))
    }

    pub fn record_saved(&self) {
        self.records_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn storage_failed(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Freezes the counters into a summary
    pub fn summary(&self, elapsed: Duration) -> CrawlSummary {
        CrawlSummary {
            pages_scanned: self.pages_scanned.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            records_saved: self.records_saved.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Outcome of a finished crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Listing pages requested, including empty and failed ones
    pub pages_scanned: u64,
    pub links_enqueued: u64,
    pub records_saved: u64,
    /// Detail pages whose record failed validation
    pub records_rejected: u64,
    /// Listing and detail fetches that failed
    pub fetch_failures: u64,
    pub storage_failures: u64,
    pub elapsed: Duration,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages scanned, {} links enqueued, {} records saved, {} rejected, {} fetch failures, {} storage failures in {:.2}s",
            self.pages_scanned,
            self.links_enqueued,
            self.records_saved,
            self.records_rejected,
            self.fetch_failures,
            self.storage_failures,
            self.elapsed.as_secs_f64()
        )
    }
}
