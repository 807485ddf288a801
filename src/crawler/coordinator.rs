//! Crawler coordinator - main crawl orchestration logic
//!
//! One run walks the listing pages in order (the producer), hands every
//! detail link to a fixed pool of workers through the work queue and
//! persists each extracted record. The run ends once the producer has seen
//! enough consecutive empty pages, the queue has drained and every worker
//! has exited.

use crate::config::Config;
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::fetcher::{build_http_client, PageFetcher};
use crate::crawler::links::LinkFetcher;
use crate::crawler::queue::{work_queue, CrawlWorkItem, WorkReceiver, WorkSender};
use crate::crawler::stats::{CrawlStats, CrawlSummary};
use crate::record::CarRecord;
use crate::storage::{self, SharedStorage, Storage, StorageError, UpsertOutcome};
use crate::ScraperError;
use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

/// Everything a worker needs, shared across the pool
struct CrawlContext {
    fetcher: PageFetcher,
    extractor: RecordExtractor,
    storage: SharedStorage,
    stats: CrawlStats,
}

impl CrawlContext {
    /// Worker loop: runs until the producer is done and the queue is empty
    async fn work(self: Arc<Self>, worker_id: u32, queue: WorkReceiver) {
        tracing::debug!("[Worker-{}] Started", worker_id);

        while let Some(item) = queue.recv().await {
            self.stats.item_started();
            self.process(worker_id, &item).await;
        }

        tracing::debug!("[Worker-{}] Queue drained, exiting", worker_id);
    }

    async fn process(&self, worker_id: u32, item: &CrawlWorkItem) {
        let html = match self.fetcher.get(&item.url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    "[Worker-{}] Failed to fetch {} (listing page {}): {}",
                    worker_id,
                    item.url,
                    item.page,
                    e
                );
                self.stats.fetch_failed();
                return;
            }
        };

        match self.extractor.extract_record(&html, &item.url).await {
            Some(record) => self.persist(&record),
            None => self.stats.record_rejected(),
        }
    }

    fn persist(&self, record: &CarRecord) {
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);

        match storage.upsert_car(record) {
            Ok(UpsertOutcome::Inserted(id)) => {
                tracing::debug!("[Storage] Inserted car {} ({})", id, record.url);
                self.stats.record_saved();
            }
            Ok(UpsertOutcome::Updated(id)) => {
                tracing::debug!("[Storage] Updated car {} ({})", id, record.url);
                self.stats.record_saved();
            }
            Err(StorageError::ConstraintViolation(e)) => {
                tracing::warn!("[Storage] Integrity conflict on {}: {}", record.url, e);
            }
            Err(e) => {
                tracing::error!("[Storage] Failed to save {}: {}", record.url, e);
                self.stats.storage_failed();
            }
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    listing_url: Url,
    links: LinkFetcher,
    context: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a coordinator for one crawl run
    ///
    /// Fails only when the HTTP session or the configured URLs cannot be set
    /// up; nothing after this point aborts the run.
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self, ScraperError> {
        let client = build_http_client(&config.crawler)?;
        let fetcher = PageFetcher::new(
            client,
            config.crawler.max_concurrent_requests as usize,
            config.site.base_url.trim_end_matches('/'),
        );

        let listing_url = Url::parse(&config.site.listing_url)?;
        let links = LinkFetcher::new(
            Url::parse(&config.site.base_url)?,
            config.site.detail_marker.clone(),
        );
        let extractor = RecordExtractor::new(fetcher.clone(), config.site.phone_url.clone());

        let context = Arc::new(CrawlContext {
            fetcher,
            extractor,
            storage,
            stats: CrawlStats::default(),
        });

        Ok(Self {
            config: Arc::new(config),
            listing_url,
            links,
            context,
        })
    }

    /// Runs the crawl to completion
    ///
    /// A worker that panics does not stop the others: the queue is still
    /// drained, and the panic is reported as [`ScraperError::Join`] once
    /// every worker has exited.
    pub async fn run(self) -> Result<CrawlSummary, ScraperError> {
        let start = Instant::now();
        let workers = self.config.crawler.max_workers.max(1);

        tracing::info!(
            "[Crawler] Starting crawl of {} with {} workers and {} concurrent requests",
            self.listing_url,
            workers,
            self.config.crawler.max_concurrent_requests
        );

        let (sender, receiver) = work_queue();
        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(self.context.clone().work(worker_id, receiver.clone()));
        }
        drop(receiver);

        // The sender is dropped when pagination ends, which lets the
        // workers drain the backlog and exit
        self.produce(sender).await;

        tracing::info!(
            "[Crawler] Pagination finished, {} items still queued",
            self.context.stats.backlog()
        );

        let mut failure = None;
        while let Some(result) = pool.join_next().await {
            if let Err(e) = result {
                tracing::error!("[Crawler] Worker task failed: {}", e);
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        let summary = self.context.stats.summary(start.elapsed());
        tracing::info!("[Crawler] Crawl finished: {}", summary);

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }

    /// Walks listing pages until enough consecutive ones yield no links
    async fn produce(&self, queue: WorkSender) {
        let max_empty = self.config.crawler.max_empty_pages.max(1);
        let mut empty_streak = 0;
        let mut page: u32 = 1;

        while empty_streak < max_empty {
            let url = self.page_url(page);
            self.context.stats.page_scanned();

            let links = match self.context.fetcher.get(url.as_str()).await {
                Ok(html) => self.links.extract_links(&html),
                Err(e) => {
                    tracing::warn!("[Producer] Failed to fetch listing page {}: {}", page, e);
                    self.context.stats.fetch_failed();
                    Vec::new()
                }
            };

            if links.is_empty() {
                empty_streak += 1;
                tracing::info!(
                    "[Producer] Page {} has no listings ({}/{} consecutive)",
                    page,
                    empty_streak,
                    max_empty
                );
            } else {
                empty_streak = 0;
                let count = links.len();
                self.context.stats.links_enqueued(count);
                for url in links {
                    if queue.send(CrawlWorkItem { url, page }).is_err() {
                        tracing::error!("[Producer] Every worker has exited, stopping at page {}", page);
                        return;
                    }
                }
                tracing::info!(
                    "[Producer] Page {}: enqueued {} links, backlog {}",
                    page,
                    count,
                    self.context.stats.backlog()
                );
            }

            page += 1;
        }

        tracing::info!(
            "[Producer] Stopping pagination after page {}: {} consecutive empty pages",
            page - 1,
            empty_streak
        );
    }

    /// Listing URL with the `page` query parameter set
    fn page_url(&self, page: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url
    }
}

/// Opens the configured database and runs one crawl
///
/// # Example
///
/// ```no_run
/// use ria_cars::config::load_config;
/// use ria_cars::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_crawl(config).await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, ScraperError> {
    let storage = storage::open_shared(Path::new(&config.storage.database_path))?;
    Coordinator::new(config, storage)?.run().await
}
